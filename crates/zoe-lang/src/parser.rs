//! Recursive-descent parser for Zoel.
//!
//! ```text
//! genome     := gene+ EOF
//! gene       := ["When" block] "Do" block
//! block      := "{" (expr [","])* "}"
//! expr       := number | string | register | block | operation
//! operation  := OperatorName [expr]
//! ```

use crate::ast::{Block, Expression, Operation, Operator, RegisterRef, Rule};
use crate::error::{Result, SyntaxError};
use crate::lexer::{Lexer, Token, TokenType};

const WHEN: &str = "When";
const DO: &str = "Do";
static EOF: TokenType = TokenType::Eof;

/// Parses a whole genome: one or more `When {..} Do {..}` genes.
pub fn parse_rules(source: &str) -> Result<Vec<Rule>> {
    let mut parser = Parser::new(Lexer::new(source).tokenize()?);
    let mut rules = Vec::new();
    while !parser.is_at_end() {
        rules.push(parser.parse_rule()?);
    }
    if rules.is_empty() {
        return Err(parser.error("a gene starting with 'When' or 'Do'"));
    }
    Ok(rules)
}

/// Parses a single `{ ... }` block.
pub fn parse_block(source: &str) -> Result<Block> {
    let mut parser = Parser::new(Lexer::new(source).tokenize()?);
    let block = parser.parse_block()?;
    parser.expect_end()?;
    Ok(block)
}

/// Parses a single expression.
pub fn parse_expression(source: &str) -> Result<Expression> {
    let mut parser = Parser::new(Lexer::new(source).tokenize()?);
    let expression = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expression)
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse_rule(&mut self) -> Result<Rule> {
        let condition = if self.check_word(WHEN) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        if !self.check_word(DO) {
            return Err(self.error(if condition.is_some() {
                "'Do'"
            } else {
                "'When' or 'Do'"
            }));
        }
        self.advance();
        let action = self.parse_block()?;
        Ok(Rule { condition, action })
    }

    pub fn parse_block(&mut self) -> Result<Block> {
        self.consume(&TokenType::LeftBrace, "'{'")?;
        let mut items = Vec::new();
        loop {
            match self.peek_type() {
                TokenType::RightBrace => {
                    self.advance();
                    return Ok(Block::new(items));
                }
                TokenType::Comma => self.advance(),
                TokenType::Eof => return Err(self.error("'}'")),
                _ => items.push(self.parse_expression()?),
            }
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        match self.peek_type().clone() {
            TokenType::Number(n) => {
                self.advance();
                Ok(Expression::Number(n))
            }
            TokenType::Text(s) => {
                self.advance();
                Ok(Expression::Text(s))
            }
            TokenType::LeftBrace => Ok(Expression::Block(self.parse_block()?)),
            TokenType::Word(word) => {
                if let Some(register) = RegisterRef::from_word(&word) {
                    self.advance();
                    return Ok(Expression::Register(register));
                }
                let Some(operator) = Operator::from_name(&word) else {
                    return Err(self.error("an operator or a Me./It. register"));
                };
                self.advance();
                let operand = if self.operand_follows() {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                Ok(Expression::Operation(Operation { operator, operand }))
            }
            _ => Err(self.error("an expression")),
        }
    }

    fn operand_follows(&self) -> bool {
        match self.peek_type() {
            TokenType::Comma | TokenType::RightBrace | TokenType::Eof => false,
            TokenType::Word(word) => word != WHEN && word != DO,
            _ => true,
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn consume(&mut self, expected: &TokenType, description: &str) -> Result<()> {
        if self.peek_type() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(description))
        }
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(self.peek_type(), TokenType::Word(w) if w == word)
    }

    fn is_at_end(&self) -> bool {
        *self.peek_type() == TokenType::Eof
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_type(&self) -> &TokenType {
        self.peek().map_or(&EOF, |t| &t.token_type)
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() {
            self.current += 1;
        }
    }

    fn error(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(
                token.line,
                token.column,
                token.token_type.describe(),
                expected,
            ),
            None => SyntaxError::new(0, 0, TokenType::Eof.describe(), expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Register, Whose};

    #[test]
    fn parses_action_only_gene() {
        let rules = parse_rules("Do { Move }").expect("parse");
        assert_eq!(rules.len(), 1);
        assert!(rules[0].condition.is_none());
        assert_eq!(
            rules[0].action.get(0),
            Some(&Expression::Operation(Operation::bare(Operator::Move)))
        );
    }

    #[test]
    fn operands_nest() {
        let expr = parse_expression("Not Not It.IsFamily").expect("parse");
        let Expression::Operation(outer) = expr else {
            panic!("expected operation");
        };
        let Some(inner) = outer.operand.as_deref() else {
            panic!("expected operand");
        };
        let Expression::Operation(inner) = inner else {
            panic!("expected nested operation");
        };
        assert_eq!(inner.operator, Operator::Not);
        assert_eq!(
            inner.operand.as_deref(),
            Some(&Expression::Register(RegisterRef::new(
                Whose::It,
                Register::IsFamily
            )))
        );
    }

    #[test]
    fn commas_are_optional_between_items() {
        let block = parse_block("{ IfThen { Move } Else { Turn 1 } , , }").expect("parse");
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn multiple_genes() {
        let rules =
            parse_rules("When { Me.Pain } Do { Bite }\nDo { Move }").expect("parse");
        assert_eq!(rules.len(), 2);
        assert!(rules[0].condition.is_some());
    }

    #[test]
    fn unknown_word_names_the_token() {
        let err = parse_rules("Do { Fly }").unwrap_err();
        assert_eq!(err.found, "'Fly'");
        assert_eq!(err.expected, "an operator or a Me./It. register");
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn missing_do_is_reported() {
        let err = parse_rules("When { Me.Pain } { Move }").unwrap_err();
        assert_eq!(err.expected, "'Do'");
    }

    #[test]
    fn empty_source_is_an_error() {
        assert!(parse_rules("  // nothing\n").is_err());
    }

    #[test]
    fn unclosed_block() {
        let err = parse_block("{ Move").unwrap_err();
        assert_eq!(err.expected, "'}'");
    }
}
