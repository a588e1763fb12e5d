use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::literal::Literal;

/// Key/value store written by `Set` and read by `Get`.
///
/// Entries keep insertion order; updating a key leaves its position alone.
/// When an insert pushes the size past the capacity, the oldest entries go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    entries: VecDeque<(Literal, Literal)>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, or numeric zero for unknown keys.
    #[must_use]
    pub fn get(&self, key: &Literal) -> Literal {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or(Literal::ZERO, |(_, v)| v.clone())
    }

    pub fn put(&mut self, key: Literal, value: Literal, capacity: usize) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push_back((key, value));
        }
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_key_reads_zero() {
        assert_eq!(Memory::new().get(&Literal::from("k")), Literal::ZERO);
    }

    #[test]
    fn evicts_eldest_past_capacity() {
        let mut memory = Memory::new();
        memory.put(Literal::from("a"), Literal::Number(1.0), 2);
        memory.put(Literal::from("b"), Literal::Number(2.0), 2);
        memory.put(Literal::from("a"), Literal::Number(3.0), 2);
        memory.put(Literal::from("c"), Literal::Number(4.0), 2);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.get(&Literal::from("a")), Literal::ZERO);
        assert_eq!(memory.get(&Literal::from("b")), Literal::Number(2.0));
        assert_eq!(memory.get(&Literal::from("c")), Literal::Number(4.0));
    }
}
