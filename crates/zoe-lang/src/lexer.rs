//! Lexer for Zoel source text.
//!
//! Converts raw text into words, numbers, quoted strings and the `{ } ,`
//! punctuation, skipping whitespace and `//` / `/* */` comments.

use crate::error::{Result, SyntaxError};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    /// Operator names, register references and the `When`/`Do` keywords.
    Word(String),
    Number(f64),
    Text(String),
    LeftBrace,
    RightBrace,
    Comma,
    Eof,
}

impl TokenType {
    /// Source-like spelling for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Word(w) => format!("'{w}'"),
            Self::Number(n) => format!("number {n}"),
            Self::Text(s) => format!("string \"{s}\""),
            Self::LeftBrace => "'{'".to_owned(),
            Self::RightBrace => "'}'".to_owned(),
            Self::Comma => "','".to_owned(),
            Self::Eof => "end of input".to_owned(),
        }
    }
}

/// Token with location information.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input, ending with [`TokenType::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let line = self.line;
        let column = self.column;
        let token = |token_type| Token {
            token_type,
            line,
            column,
        };

        let Some(ch) = self.current_char() else {
            return Ok(token(TokenType::Eof));
        };

        let token_type = match ch {
            '{' => {
                self.advance();
                TokenType::LeftBrace
            }
            '}' => {
                self.advance();
                TokenType::RightBrace
            }
            ',' => {
                self.advance();
                TokenType::Comma
            }
            '"' => self.read_string()?,
            '-' | '.' | '0'..='9' => self.read_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_word(),
            other => {
                return Err(SyntaxError::new(
                    line,
                    column,
                    format!("'{other}'"),
                    "a word, number, string, '{', '}' or ','",
                ));
            }
        };
        Ok(token(token_type))
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.current_char(), self.peek_char()) {
                (Some(c), _) if c.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.current_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current_char(), self.peek_char()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                return Err(SyntaxError::new(
                                    line,
                                    column,
                                    "unterminated comment",
                                    "'*/'",
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_string(&mut self) -> Result<TokenType> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.current_char() {
                None => {
                    return Err(SyntaxError::new(
                        line,
                        column,
                        "unterminated string",
                        "closing '\"'",
                    ));
                }
                Some('"') => {
                    self.advance();
                    return Ok(TokenType::Text(value));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => continue,
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<TokenType> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        if self.current_char() == Some('-') {
            text.push('-');
            self.advance();
        }
        let mut seen_dot = false;
        while let Some(c) = self.current_char() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                text.push(c);
            } else {
                break;
            }
            self.advance();
        }
        text.parse::<f64>()
            .map(TokenType::Number)
            .map_err(|_| SyntaxError::new(line, column, format!("'{text}'"), "a number"))
    }

    fn read_word(&mut self) -> TokenType {
        let mut word = String::new();
        while let Some(c) = self.current_char() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        TokenType::Word(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenType> {
        Lexer::new(src)
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn tokenizes_gene() {
        assert_eq!(
            kinds("When { Me.Pain } Do { Turn -1.5, Print \"ouch\" }"),
            vec![
                TokenType::Word("When".into()),
                TokenType::LeftBrace,
                TokenType::Word("Me.Pain".into()),
                TokenType::RightBrace,
                TokenType::Word("Do".into()),
                TokenType::LeftBrace,
                TokenType::Word("Turn".into()),
                TokenType::Number(-1.5),
                TokenType::Comma,
                TokenType::Word("Print".into()),
                TokenType::Text("ouch".into()),
                TokenType::RightBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("// header\nDo /* inline */ { Move }"),
            vec![
                TokenType::Word("Do".into()),
                TokenType::LeftBrace,
                TokenType::Word("Move".into()),
                TokenType::RightBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = Lexer::new("Do\n  { Move }").tokenize().expect("tokenize");
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn reports_bad_characters() {
        let err = Lexer::new("Do { Move; }").tokenize().unwrap_err();
        assert_eq!((err.line, err.column), (1, 10));
        assert_eq!(err.found, "';'");
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#),
            vec![TokenType::Text("a\"b\n".into()), TokenType::Eof]
        );
    }

    #[test]
    fn lone_minus_is_an_error() {
        assert!(Lexer::new("{ - }").tokenize().is_err());
    }
}
