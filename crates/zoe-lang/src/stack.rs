use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::literal::Literal;

/// Operand stack with oldest-first eviction.
///
/// Reading an empty stack yields numeric zero. The capacity is supplied on
/// every push because it grows with the organism's age.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperandStack {
    items: VecDeque<Literal>,
}

impl OperandStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Literal, capacity: usize) {
        self.items.push_back(value);
        while self.items.len() > capacity.max(1) {
            self.items.pop_front();
        }
    }

    pub fn pop(&mut self) -> Literal {
        self.items.pop_back().unwrap_or(Literal::ZERO)
    }

    /// Copy of the top value.
    #[must_use]
    pub fn top(&self) -> Literal {
        self.items.back().cloned().unwrap_or(Literal::ZERO)
    }

    /// Replaces the top value, or pushes onto an empty stack.
    pub fn poke(&mut self, value: Literal) {
        match self.items.back_mut() {
            Some(top) => *top = value,
            None => self.items.push_back(value),
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

    /// Values from the top down.
    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.items.iter().rev()
    }
}
