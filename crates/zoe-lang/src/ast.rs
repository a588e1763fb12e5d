//! Closed expression tree for Zoel programs.
//!
//! Blocks share their item vectors through `Arc`, so cloning a tree is
//! cheap and a running [`crate::Machine`] can hold on to the blocks it is
//! walking. Edits go through [`Block::items_mut`], which copies on write;
//! [`Expression::deep_copy`] produces a fully independent tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::literal::Literal;

/// Built-in operators, in their canonical order.
///
/// Everything up to and including [`Operator::EndTurn`] ends the organism's
/// turn when it does something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Move,
    Bite,
    Barf,
    Mate,
    Spawn,
    Split,
    EndTurn,
    Turn,
    SenseFarther,
    Mood,
    Print,
    IfThen,
    Else,
    While,
    Push,
    Pop,
    Set,
    Get,
    And,
    Or,
    Equals,
    LessThan,
    GreaterThan,
    Plus,
    Minus,
    Times,
    DividedBy,
    Modulus,
    Not,
    Random,
    Negate,
    AbsoluteVal,
}

impl Operator {
    pub const ALL: [Operator; 32] = [
        Operator::Move,
        Operator::Bite,
        Operator::Barf,
        Operator::Mate,
        Operator::Spawn,
        Operator::Split,
        Operator::EndTurn,
        Operator::Turn,
        Operator::SenseFarther,
        Operator::Mood,
        Operator::Print,
        Operator::IfThen,
        Operator::Else,
        Operator::While,
        Operator::Push,
        Operator::Pop,
        Operator::Set,
        Operator::Get,
        Operator::And,
        Operator::Or,
        Operator::Equals,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::Plus,
        Operator::Minus,
        Operator::Times,
        Operator::DividedBy,
        Operator::Modulus,
        Operator::Not,
        Operator::Random,
        Operator::Negate,
        Operator::AbsoluteVal,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Bite => "Bite",
            Self::Barf => "Barf",
            Self::Mate => "Mate",
            Self::Spawn => "Spawn",
            Self::Split => "Split",
            Self::EndTurn => "EndTurn",
            Self::Turn => "Turn",
            Self::SenseFarther => "SenseFarther",
            Self::Mood => "Mood",
            Self::Print => "Print",
            Self::IfThen => "IfThen",
            Self::Else => "Else",
            Self::While => "While",
            Self::Push => "Push",
            Self::Pop => "Pop",
            Self::Set => "Set",
            Self::Get => "Get",
            Self::And => "And",
            Self::Or => "Or",
            Self::Equals => "Equals",
            Self::LessThan => "LessThan",
            Self::GreaterThan => "GreaterThan",
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Times => "Times",
            Self::DividedBy => "DividedBy",
            Self::Modulus => "Modulus",
            Self::Not => "Not",
            Self::Random => "Random",
            Self::Negate => "Negate",
            Self::AbsoluteVal => "AbsoluteVal",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Operators whose successful execution ends the turn.
    #[must_use]
    pub fn is_turn_ending(self) -> bool {
        self.index() <= Self::EndTurn.index()
    }

    /// Operators carried out by the host rather than the machine.
    #[must_use]
    pub fn is_action(self) -> bool {
        matches!(
            self,
            Self::Move
                | Self::Bite
                | Self::Barf
                | Self::Mate
                | Self::Spawn
                | Self::Split
                | Self::Turn
                | Self::SenseFarther
        )
    }

    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Or
                | Self::Equals
                | Self::LessThan
                | Self::GreaterThan
                | Self::Plus
                | Self::Minus
                | Self::Times
                | Self::DividedBy
                | Self::Modulus
        )
    }

    /// Whether a fresh stack slot is pushed before the operand is evaluated.
    #[must_use]
    pub fn reserves_slot(self) -> bool {
        self.is_binary() || matches!(self, Self::Push | Self::Set)
    }

    /// Operand evaluation is skipped when the stack top is false.
    #[must_use]
    pub fn skips_when_false(self) -> bool {
        matches!(self, Self::IfThen | Self::While | Self::And)
    }

    /// Operand evaluation is skipped when the stack top is true.
    #[must_use]
    pub fn skips_when_true(self) -> bool {
        matches!(self, Self::Else | Self::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-computed attributes readable from Zoel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    Cycle,
    Id,
    Age,
    Size,
    Strength,
    Heading,
    Location,
    BirthLocation,
    AncestralLocation,
    Species,
    Mood,
    Pain,
    FeelSomething,
    SeeSomething,
    Toward,
    Away,
    IsAlive,
    IsParent,
    IsChild,
    IsLastMate,
    IsAncestor,
    IsDescendent,
    IsSameSpecies,
    IsFamily,
    Range,
}

impl Register {
    pub const ALL: [Register; 25] = [
        Register::Cycle,
        Register::Id,
        Register::Age,
        Register::Size,
        Register::Strength,
        Register::Heading,
        Register::Location,
        Register::BirthLocation,
        Register::AncestralLocation,
        Register::Species,
        Register::Mood,
        Register::Pain,
        Register::FeelSomething,
        Register::SeeSomething,
        Register::Toward,
        Register::Away,
        Register::IsAlive,
        Register::IsParent,
        Register::IsChild,
        Register::IsLastMate,
        Register::IsAncestor,
        Register::IsDescendent,
        Register::IsSameSpecies,
        Register::IsFamily,
        Register::Range,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cycle => "Cycle",
            Self::Id => "ID",
            Self::Age => "Age",
            Self::Size => "Size",
            Self::Strength => "Strength",
            Self::Heading => "Heading",
            Self::Location => "Location",
            Self::BirthLocation => "BirthLocation",
            Self::AncestralLocation => "AncestralLocation",
            Self::Species => "Species",
            Self::Mood => "Mood",
            Self::Pain => "Pain",
            Self::FeelSomething => "FeelSomething",
            Self::SeeSomething => "SeeSomething",
            Self::Toward => "Toward",
            Self::Away => "Away",
            Self::IsAlive => "IsAlive",
            Self::IsParent => "IsParent",
            Self::IsChild => "IsChild",
            Self::IsLastMate => "IsLastMate",
            Self::IsAncestor => "IsAncestor",
            Self::IsDescendent => "IsDescendent",
            Self::IsSameSpecies => "IsSameSpecies",
            Self::IsFamily => "IsFamily",
            Self::Range => "Range",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reg| reg.name() == name)
    }

    /// Reading this register refreshes perception (once per cycle).
    #[must_use]
    pub fn requires_looking(self) -> bool {
        self as usize >= Self::FeelSomething as usize
    }

    /// Symmetric relations: `It.X` equals `Me.X` evaluated against it.
    #[must_use]
    pub fn same_for_both(self) -> bool {
        self as usize >= Self::IsSameSpecies as usize
    }
}

/// Owner of a register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Whose {
    /// The organism running the program.
    Me,
    /// Whatever the organism sensed last.
    It,
}

impl Whose {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Me => "Me",
            Self::It => "It",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterRef {
    pub whose: Whose,
    pub register: Register,
}

impl RegisterRef {
    #[must_use]
    pub const fn new(whose: Whose, register: Register) -> Self {
        Self { whose, register }
    }

    #[must_use]
    pub const fn me(register: Register) -> Self {
        Self::new(Whose::Me, register)
    }

    #[must_use]
    pub const fn it(register: Register) -> Self {
        Self::new(Whose::It, register)
    }

    /// Parses `Me.<Register>` / `It.<Register>`.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        let (owner, name) = word.split_once('.')?;
        let whose = match owner {
            "Me" => Whose::Me,
            "It" => Whose::It,
            _ => return None,
        };
        Register::from_name(name).map(|register| Self { whose, register })
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whose.name(), self.register.name())
    }
}

/// One node of a Zoel program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Block(Block),
    Operation(Operation),
    Register(RegisterRef),
    Number(f64),
    Text(String),
}

/// An operator with an optional operand expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operator: Operator,
    pub operand: Option<Box<Expression>>,
}

impl Operation {
    #[must_use]
    pub fn bare(operator: Operator) -> Self {
        Self {
            operator,
            operand: None,
        }
    }

    #[must_use]
    pub fn with(operator: Operator, operand: Expression) -> Self {
        Self {
            operator,
            operand: Some(Box::new(operand)),
        }
    }
}

/// A `{ ... }` sequence of expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    items: Arc<Vec<Expression>>,
}

/// Location of a statement slot inside a block tree: the chain of item
/// indices leading to the nested block, then the slot index within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPosition {
    pub path: Vec<usize>,
    pub index: usize,
}

impl Block {
    #[must_use]
    pub fn new(items: Vec<Expression>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Expression> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.items.iter()
    }

    /// Mutable access, copying the items first if they are shared.
    pub fn items_mut(&mut self) -> &mut Vec<Expression> {
        Arc::make_mut(&mut self.items)
    }

    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self::new(self.items.iter().map(Expression::deep_copy).collect())
    }

    /// Number of statement slots in this block and every nested block.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| 1 + item.nested_block().map_or(0, Block::statement_count))
            .sum()
    }

    /// Addresses the `n`th statement slot in depth-first order.
    #[must_use]
    pub fn position_of(&self, n: usize) -> Option<StatementPosition> {
        let mut remaining = n;
        let mut path = Vec::new();
        self.locate(&mut remaining, &mut path)
    }

    fn locate(&self, remaining: &mut usize, path: &mut Vec<usize>) -> Option<StatementPosition> {
        for (index, item) in self.items.iter().enumerate() {
            if *remaining == 0 {
                return Some(StatementPosition {
                    path: path.clone(),
                    index,
                });
            }
            *remaining -= 1;
            if let Some(inner) = item.nested_block() {
                path.push(index);
                if let Some(found) = inner.locate(remaining, path) {
                    return Some(found);
                }
                path.pop();
            }
        }
        None
    }

    /// The nested block reached by following `path` from this block.
    pub fn block_at_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let item = self.items_mut().get_mut(*first)?;
        item.nested_block_mut()?.block_at_mut(rest)
    }

    /// Canonical text. A separator containing a newline indents nested
    /// blocks.
    #[must_use]
    pub fn render(&self, separator: &str) -> String {
        let mut out = String::new();
        self.write_to(&mut out, separator);
        out
    }

    fn write_to(&self, out: &mut String, separator: &str) {
        let inner = if separator.contains('\n') {
            format!("{separator}    ")
        } else {
            separator.to_owned()
        };
        out.push('{');
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&inner);
            item.write_to(out, &inner);
        }
        out.push_str(separator);
        out.push('}');
    }
}

impl FromIterator<Expression> for Block {
    fn from_iter<I: IntoIterator<Item = Expression>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Expression {
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Block(block) => Self::Block(block.deep_copy()),
            Self::Operation(op) => Self::Operation(Operation {
                operator: op.operator,
                operand: op.operand.as_ref().map(|e| Box::new(e.deep_copy())),
            }),
            Self::Register(r) => Self::Register(*r),
            Self::Number(n) => Self::Number(*n),
            Self::Text(s) => Self::Text(s.clone()),
        }
    }

    /// The literal an evaluation of this node pokes, if it is a literal.
    #[must_use]
    pub fn as_literal(&self) -> Option<Literal> {
        match self {
            Self::Number(n) => Some(Literal::Number(*n)),
            Self::Text(s) => Some(Literal::Text(s.clone())),
            _ => None,
        }
    }

    /// The block reached through this node: itself, or an operand chain
    /// ending in a block.
    #[must_use]
    pub fn nested_block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            Self::Operation(op) => op.operand.as_deref().and_then(Expression::nested_block),
            _ => None,
        }
    }

    pub fn nested_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Self::Block(block) => Some(block),
            Self::Operation(op) => op
                .operand
                .as_deref_mut()
                .and_then(Expression::nested_block_mut),
            _ => None,
        }
    }

    #[must_use]
    pub fn render(&self, separator: &str) -> String {
        let mut out = String::new();
        self.write_to(&mut out, separator);
        out
    }

    fn write_to(&self, out: &mut String, separator: &str) {
        match self {
            Self::Block(block) => block.write_to(out, separator),
            Self::Operation(op) => {
                out.push_str(op.operator.name());
                if let Some(operand) = &op.operand {
                    out.push(' ');
                    operand.write_to(out, separator);
                }
            }
            Self::Register(r) => out.push_str(&r.to_string()),
            Self::Number(n) => out.push_str(&Literal::format_number(*n)),
            Self::Text(s) => {
                out.push('"');
                for ch in s.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(" "))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(" "))
    }
}

/// A gene's program: an optional condition and an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub condition: Option<Block>,
    pub action: Block,
}

impl Rule {
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            condition: self.condition.as_ref().map(Block::deep_copy),
            action: self.action.deep_copy(),
        }
    }

    #[must_use]
    pub fn render(&self, separator: &str) -> String {
        let mut out = String::new();
        if let Some(condition) = &self.condition {
            out.push_str("When ");
            out.push_str(&condition.render(separator));
            out.push_str(separator);
        }
        out.push_str("Do ");
        out.push_str(&self.action.render(separator));
        out
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Block {
        Block::new(vec![
            Expression::Register(RegisterRef::me(Register::Pain)),
            Expression::Operation(Operation::with(
                Operator::IfThen,
                Expression::Block(Block::new(vec![
                    Expression::Operation(Operation::bare(Operator::Move)),
                    Expression::Number(2.0),
                ])),
            )),
            Expression::Text("hi".into()),
        ])
    }

    #[test]
    fn renders_single_line() {
        assert_eq!(
            sample().render(" "),
            "{ Me.Pain, IfThen { Move, 2 }, \"hi\" }"
        );
    }

    #[test]
    fn renders_indented() {
        let text = sample().render("\n");
        assert!(text.starts_with("{\n    Me.Pain,"));
        assert!(text.contains("\n        Move"));
        assert!(text.ends_with("\n}"));
    }

    #[test]
    fn statement_count_includes_nested_blocks() {
        assert_eq!(sample().statement_count(), 5);
    }

    #[test]
    fn position_of_walks_depth_first() {
        let block = sample();
        assert_eq!(
            block.position_of(0),
            Some(StatementPosition { path: vec![], index: 0 })
        );
        assert_eq!(
            block.position_of(2),
            Some(StatementPosition { path: vec![1], index: 0 })
        );
        assert_eq!(
            block.position_of(3),
            Some(StatementPosition { path: vec![1], index: 1 })
        );
        assert_eq!(
            block.position_of(4),
            Some(StatementPosition { path: vec![], index: 2 })
        );
        assert_eq!(block.position_of(5), None);
    }

    #[test]
    fn deep_copy_is_independent() {
        let original = sample();
        let mut copy = original.deep_copy();
        copy.block_at_mut(&[1])
            .expect("nested block")
            .items_mut()
            .push(Expression::Number(9.0));
        assert_eq!(original.statement_count(), 5);
        assert_eq!(copy.statement_count(), 6);
    }

    #[test]
    fn names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.name()), Some(op));
        }
        for reg in Register::ALL {
            assert_eq!(Register::from_name(reg.name()), Some(reg));
        }
        assert!(Operator::Split.is_turn_ending());
        assert!(!Operator::Turn.is_turn_ending());
        assert!(Register::Range.same_for_both());
        assert!(!Register::Pain.requires_looking());
    }

    #[test]
    fn register_words_parse() {
        assert_eq!(
            RegisterRef::from_word("It.IsFamily"),
            Some(RegisterRef::it(Register::IsFamily))
        );
        assert_eq!(RegisterRef::from_word("You.Age"), None);
        assert_eq!(RegisterRef::from_word("Me.Nothing"), None);
    }
}
