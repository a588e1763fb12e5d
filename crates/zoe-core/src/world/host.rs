use rand::RngCore;
use zoe_lang::{Host, Literal, Operator, RegisterRef, Torus, Turn};

use super::World;
use crate::BugId;
use crate::phenotype::RuleHost;

/// The world as seen by one bug's program during its turn.
pub(crate) struct BugHost<'w> {
    world: &'w mut World,
    bug: BugId,
    evaluating_condition: bool,
}

impl<'w> BugHost<'w> {
    pub(crate) fn new(world: &'w mut World, bug: BugId) -> Self {
        Self {
            world,
            bug,
            evaluating_condition: false,
        }
    }

    fn data_capacity(&self) -> usize {
        let age = self.world.bugs.get(self.bug).map_or(0, |bug| bug.age);
        self.world.config.max_data_size(age)
    }
}

impl Host for BugHost<'_> {
    fn read_register(&mut self, register: RegisterRef) -> Literal {
        self.world.read_register(self.bug, register)
    }

    fn read_memory(&mut self, key: &Literal) -> Literal {
        self.world
            .bugs
            .get(self.bug)
            .map_or(Literal::ZERO, |bug| bug.memory.get(key))
    }

    fn write_memory(&mut self, key: Literal, value: Literal) {
        let capacity = self.data_capacity();
        if let Some(bug) = self.world.bugs.get_mut(self.bug) {
            bug.memory.put(key, value, capacity);
        }
    }

    fn perform_action(&mut self, operator: Operator, operand: &Literal) -> Turn {
        if self.evaluating_condition && operator.is_turn_ending() {
            return Turn::Continues;
        }
        self.world.perform_action(self.bug, operator, operand)
    }

    fn max_operand_stack_depth(&self) -> usize {
        self.data_capacity()
    }

    fn max_steps_per_resume(&self) -> usize {
        self.world.config.max_thoughts_per_cycle
    }

    fn random_source(&mut self) -> &mut dyn RngCore {
        &mut self.world.rng
    }

    fn torus(&self) -> Torus {
        self.world.config.torus()
    }

    fn trace_prefix(&self) -> Option<String> {
        if !self.world.config.trace {
            return None;
        }
        let serial = self.world.bugs.get(self.bug).map_or(0, |bug| bug.serial);
        Some(format!("{} {serial}", self.world.cycle))
    }
}

impl RuleHost for BugHost<'_> {
    fn set_evaluating_condition(&mut self, evaluating: bool) {
        self.evaluating_condition = evaluating;
    }
}
