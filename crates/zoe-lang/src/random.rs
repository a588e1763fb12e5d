//! Biased random synthesis and point mutation of Zoel trees.
//!
//! Draws lean on a small curated set of registers and operators that tend
//! to produce working behaviour; the wild-choice probabilities let any
//! register or non-action operator through occasionally.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::ast::{Block, Expression, Operation, Operator, Register, RegisterRef, Rule, Whose};

const GOOD_REGISTERS: [Register; 5] = [
    Register::Pain,
    Register::FeelSomething,
    Register::SeeSomething,
    Register::IsSameSpecies,
    Register::IsFamily,
];

const GOOD_OPERATORS: [Operator; 3] = [Operator::And, Operator::Or, Operator::Not];

/// Tunable bias of random tree generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TreeBias {
    /// Probability of drawing any non-action operator instead of And/Or/Not.
    pub wild_operator_probability: f64,
    /// Probability of drawing any register instead of the curated set.
    pub wild_register_probability: f64,
}

impl Default for TreeBias {
    fn default() -> Self {
        Self {
            wild_operator_probability: 0.1,
            wild_register_probability: 0.1,
        }
    }
}

/// Kinds of statement-level edit applied by [`TreeBias::mutate_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementEdit {
    Insert,
    Delete,
    Translocate,
    Replace,
}

impl TreeBias {
    #[must_use]
    pub fn register(&self, rng: &mut dyn RngCore) -> RegisterRef {
        if rng.random::<f64>() < self.wild_register_probability {
            let register = Register::ALL[rng.random_range(0..Register::ALL.len())];
            let whose = if rng.random::<bool>() {
                Whose::Me
            } else {
                Whose::It
            };
            return RegisterRef::new(whose, register);
        }
        let register = GOOD_REGISTERS[rng.random_range(0..GOOD_REGISTERS.len())];
        let whose = match register {
            Register::Pain | Register::FeelSomething | Register::SeeSomething => Whose::Me,
            _ => Whose::It,
        };
        RegisterRef::new(whose, register)
    }

    #[must_use]
    pub fn operator(&self, rng: &mut dyn RngCore, actions_allowed: bool) -> Operator {
        if actions_allowed {
            if rng.random::<bool>() {
                return Operator::Move;
            }
            if rng.random::<bool>() {
                return Operator::Turn;
            }
            return if rng.random::<bool>() {
                Operator::Bite
            } else {
                Operator::Mate
            };
        }
        if rng.random::<f64>() < self.wild_operator_probability {
            let first = Operator::EndTurn.index();
            let count = Operator::ALL.len() - first;
            return Operator::ALL[first + rng.random_range(0..count)];
        }
        GOOD_OPERATORS[rng.random_range(0..GOOD_OPERATORS.len())]
    }

    #[must_use]
    pub fn operation(&self, rng: &mut dyn RngCore, actions_allowed: bool) -> Operation {
        let operator = self.operator(rng, actions_allowed);
        let operand = match operator {
            Operator::IfThen | Operator::Else => Some(Expression::Block(Block::new(vec![
                self.expression(rng, actions_allowed),
            ]))),
            Operator::And | Operator::Or | Operator::Not => {
                if rng.random::<bool>() {
                    None
                } else {
                    Some(Expression::Register(self.register(rng)))
                }
            }
            Operator::Push => Some(Expression::Register(self.register(rng))),
            _ => None,
        };
        Operation {
            operator,
            operand: operand.map(Box::new),
        }
    }

    #[must_use]
    pub fn expression(&self, rng: &mut dyn RngCore, actions_allowed: bool) -> Expression {
        if rng.random::<bool>() {
            Expression::Register(self.register(rng))
        } else {
            Expression::Operation(self.operation(rng, actions_allowed))
        }
    }

    /// A condition: a register read, optionally negated or combined with a
    /// second register.
    #[must_use]
    pub fn condition(&self, rng: &mut dyn RngCore) -> Block {
        let mut items = vec![Expression::Register(self.register(rng))];
        if rng.random::<bool>() {
            return Block::new(items);
        }
        if rng.random::<bool>() {
            items.push(Expression::Operation(Operation::bare(Operator::Not)));
            return Block::new(items);
        }
        let operator = if rng.random::<bool>() {
            Operator::And
        } else {
            Operator::Or
        };
        items.push(Expression::Operation(Operation::with(
            operator,
            Expression::Register(self.register(rng)),
        )));
        Block::new(items)
    }

    /// An action: one or two action operations.
    #[must_use]
    pub fn action(&self, rng: &mut dyn RngCore) -> Block {
        let mut items = vec![Expression::Operation(self.operation(rng, true))];
        for _ in 0..rng.random_range(0..2) {
            items.push(Expression::Operation(self.operation(rng, true)));
        }
        Block::new(items)
    }

    #[must_use]
    pub fn rule(&self, rng: &mut dyn RngCore) -> Rule {
        let condition = self.condition(rng);
        let action = self.action(rng);
        Rule {
            condition: Some(condition),
            action,
        }
    }

    /// Applies one statement-level edit at a uniformly chosen statement slot.
    pub fn mutate_block(
        &self,
        block: &mut Block,
        rng: &mut dyn RngCore,
        actions_allowed: bool,
    ) -> StatementEdit {
        let count = block.statement_count();
        if count == 0 {
            block
                .items_mut()
                .push(self.expression(rng, actions_allowed));
            return StatementEdit::Insert;
        }
        let edit = match rng.random_range(0..4) {
            0 => StatementEdit::Insert,
            1 => StatementEdit::Delete,
            2 => StatementEdit::Translocate,
            _ => StatementEdit::Replace,
        };
        let Some(position) = block.position_of(rng.random_range(0..count)) else {
            return edit;
        };
        let Some(target) = block.block_at_mut(&position.path) else {
            return edit;
        };
        let items = target.items_mut();
        let index = position.index;
        match edit {
            StatementEdit::Insert => {
                items.insert(index + 1, self.expression(rng, actions_allowed));
            }
            StatementEdit::Delete if items.len() > 1 => {
                items.remove(index);
            }
            StatementEdit::Translocate if items.len() > 1 => {
                let moved = items.remove(index);
                let to = rng.random_range(0..items.len());
                items.insert(to, moved);
            }
            StatementEdit::Delete | StatementEdit::Translocate | StatementEdit::Replace => {
                items[index] = self.expression(rng, actions_allowed);
            }
        }
        edit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rules;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn same_seed_same_tree() {
        let bias = TreeBias::default();
        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(bias.rule(&mut a), bias.rule(&mut b));
        }
    }

    #[test]
    fn random_rules_render_and_parse_back() {
        let bias = TreeBias::default();
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        for _ in 0..50 {
            let rule = bias.rule(&mut rng);
            let text = rule.render("\n");
            let parsed = parse_rules(&text).expect("rendered rule parses");
            assert_eq!(parsed, vec![rule]);
        }
    }

    #[test]
    fn actions_only_when_allowed() {
        let bias = TreeBias {
            wild_operator_probability: 1.0,
            ..TreeBias::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let op = bias.operator(&mut rng, false);
            assert!(op == Operator::EndTurn || !op.is_turn_ending());
            let action = bias.operator(&mut rng, true);
            assert!(matches!(
                action,
                Operator::Move | Operator::Turn | Operator::Bite | Operator::Mate
            ));
        }
    }

    #[test]
    fn action_blocks_hold_one_or_two_operations() {
        let bias = TreeBias::default();
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..50 {
            let action = bias.action(&mut rng);
            assert!((1..=2).contains(&action.len()));
        }
    }

    #[test]
    fn mutation_never_empties_a_block() {
        let bias = TreeBias::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut block = bias.action(&mut rng);
        for _ in 0..200 {
            bias.mutate_block(&mut block, &mut rng, true);
            assert!(!block.is_empty());
        }
    }

    #[test]
    fn mutation_leaves_the_original_untouched() {
        let bias = TreeBias::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let original = bias.condition(&mut rng);
        let before = original.to_string();
        let mut copy = original.deep_copy();
        for _ in 0..10 {
            bias.mutate_block(&mut copy, &mut rng, false);
        }
        assert_eq!(original.to_string(), before);
    }
}
