//! Zoel: the instruction language evolved by Zoe organisms.
//!
//! The crate owns everything an organism's program needs that does not
//! depend on the world itself: the lexer and recursive-descent parser, the
//! closed expression tree, biased random tree synthesis, and the resumable
//! stack machine that executes a tree a bounded slice at a time against a
//! [`Host`].

pub mod ast;
pub mod error;
pub mod geometry;
pub mod lexer;
pub mod literal;
pub mod memory;
mod operators;
pub mod parser;
pub mod random;
pub mod stack;
pub mod vm;

pub use ast::{Block, Expression, Operation, Operator, Register, RegisterRef, Rule, Whose};
pub use error::SyntaxError;
pub use geometry::{Point, Torus};
pub use literal::Literal;
pub use memory::Memory;
pub use parser::{parse_block, parse_expression, parse_rules};
pub use random::TreeBias;
pub use stack::OperandStack;
pub use vm::{Host, Machine, Turn};
