//! Per-bug expression of a genome: one activation record per gene and the
//! stack of rules currently in progress.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;
use zoe_lang::{Host, Machine, Turn};

use crate::genome::{Gene, Genome};

/// A [`Host`] that also knows whether it is evaluating a condition, so
/// turn-ending actions can be ignored there.
pub trait RuleHost: Host {
    fn set_evaluating_condition(&mut self, evaluating: bool);
}

/// Activation state of one gene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phene {
    gene: Arc<Gene>,
    /// The in-progress action program, if the action is mid-execution.
    program: Option<Machine>,
}

impl Phene {
    #[must_use]
    pub fn new(gene: Arc<Gene>) -> Self {
        Self {
            gene,
            program: None,
        }
    }

    #[must_use]
    pub fn gene(&self) -> &Arc<Gene> {
        &self.gene
    }

    /// Whether the action is partway through.
    #[must_use]
    pub fn is_doing(&self) -> bool {
        self.program.is_some()
    }

    /// Runs the condition on a fresh machine for one resume. A rule with no
    /// condition always fires; an empty stack counts as false.
    pub fn when<H: RuleHost>(&self, host: &mut H) -> bool {
        let Some(condition) = self.gene.condition() else {
            return true;
        };
        if let Some(prefix) = host.trace_prefix() {
            trace!(target: "zoe::rules", "{prefix} When {condition}");
        }
        let mut machine = Machine::new(condition);
        host.set_evaluating_condition(true);
        machine.run(host);
        host.set_evaluating_condition(false);
        !machine.stack().is_empty() && machine.top().is_true()
    }

    /// Starts or resumes the action program.
    pub fn act<H: RuleHost>(&mut self, host: &mut H) -> Turn {
        if let Some(prefix) = host.trace_prefix() {
            trace!(target: "zoe::rules", "{prefix} Do {}", self.gene.action());
        }
        let gene = &self.gene;
        let program = self
            .program
            .get_or_insert_with(|| Machine::new(gene.action()));
        let turn = program.run(host);
        if turn == Turn::Exited {
            self.program = None;
        }
        turn
    }

    fn reset(&mut self) {
        self.program = None;
    }
}

/// All phenes of one bug, in genome priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Phenotype {
    phenes: Vec<Phene>,
    /// Indices of phenes with an action started, most recent first.
    active: VecDeque<usize>,
}

impl Phenotype {
    #[must_use]
    pub fn express(genome: &Genome) -> Self {
        Self {
            phenes: genome.iter().cloned().map(Phene::new).collect(),
            active: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn phenes(&self) -> &[Phene] {
        &self.phenes
    }

    /// The phene whose action runs first next turn, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Phene> {
        self.active.front().and_then(|&i| self.phenes.get(i))
    }

    /// One turn: walk the rules in priority order; the rule at the front
    /// of the active stack resumes, any other rule whose condition holds
    /// is pushed in front and run. Stops after the first rule whose action
    /// ends the turn. Returns that rule's index, if any.
    pub fn next<H: RuleHost>(&mut self, host: &mut H) -> Option<usize> {
        for index in 0..self.phenes.len() {
            let is_front = self.active.front() == Some(&index);
            if !is_front && !self.phenes[index].when(host) {
                continue;
            }
            if !is_front {
                self.active.retain(|&i| i != index);
                self.active.push_front(index);
            }
            let turn = self.phenes[index].act(host);
            if turn != Turn::Continues {
                self.active.pop_front();
            }
            if turn == Turn::Finished {
                return Some(index);
            }
        }
        None
    }

    /// Abandons every in-progress action.
    pub fn reset(&mut self) {
        for phene in &mut self.phenes {
            phene.reset();
        }
        self.active.clear();
    }

    /// The genome, one rule per separator-delimited chunk.
    #[must_use]
    pub fn render(&self, separator: &str) -> String {
        self.phenes
            .iter()
            .map(|phene| phene.gene.rule().render(separator))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng, rngs::SmallRng};
    use zoe_lang::{
        Literal, Memory, Operator, Register, RegisterRef, Torus, TreeBias, parse_rules,
    };

    use crate::genome::GeneFactory;

    struct Body {
        rng: SmallRng,
        memory: Memory,
        pain: bool,
        in_condition: bool,
        actions: Vec<Operator>,
    }

    impl Body {
        fn new() -> Self {
            Self {
                rng: SmallRng::seed_from_u64(0xABCD),
                memory: Memory::new(),
                pain: false,
                in_condition: false,
                actions: Vec::new(),
            }
        }
    }

    impl Host for Body {
        fn read_register(&mut self, register: RegisterRef) -> Literal {
            match register.register {
                Register::Pain => Literal::truth(self.pain),
                _ => Literal::ZERO,
            }
        }

        fn read_memory(&mut self, key: &Literal) -> Literal {
            self.memory.get(key)
        }

        fn write_memory(&mut self, key: Literal, value: Literal) {
            self.memory.put(key, value, 10);
        }

        fn perform_action(&mut self, operator: Operator, _operand: &Literal) -> Turn {
            if self.in_condition && operator.is_turn_ending() {
                return Turn::Continues;
            }
            self.actions.push(operator);
            if operator.is_turn_ending() {
                Turn::Finished
            } else {
                Turn::Continues
            }
        }

        fn max_operand_stack_depth(&self) -> usize {
            10
        }

        fn max_steps_per_resume(&self) -> usize {
            100
        }

        fn random_source(&mut self) -> &mut dyn RngCore {
            &mut self.rng
        }

        fn torus(&self) -> Torus {
            Torus::new(100.0, 100.0)
        }
    }

    impl RuleHost for Body {
        fn set_evaluating_condition(&mut self, evaluating: bool) {
            self.in_condition = evaluating;
        }
    }

    fn phenotype(source: &str) -> Phenotype {
        let mut genes = GeneFactory::new(TreeBias::default(), 0.0);
        let rules = parse_rules(source).expect("parse");
        Phenotype::express(&genes.genome_from_rules(rules).expect("genome"))
    }

    #[test]
    fn first_true_rule_ends_the_turn() {
        let mut phenotype = phenotype("When { Me.Pain } Do { Bite } Do { Move }");
        let mut body = Body::new();
        assert_eq!(phenotype.next(&mut body), Some(1));
        body.pain = true;
        assert_eq!(phenotype.next(&mut body), Some(0));
        assert_eq!(body.actions, vec![Operator::Move, Operator::Bite]);
    }

    #[test]
    fn multi_turn_action_resumes_where_it_stopped() {
        let mut phenotype = phenotype("Do { Move, Bite, Move }");
        let mut body = Body::new();
        for _ in 0..2 {
            assert_eq!(phenotype.next(&mut body), Some(0));
            assert!(phenotype.phenes()[0].is_doing());
        }
        assert_eq!(phenotype.next(&mut body), Some(0));
        assert!(phenotype.phenes()[0].is_doing());
        assert_eq!(phenotype.next(&mut body), None);
        assert!(!phenotype.phenes()[0].is_doing());
        assert_eq!(body.actions, vec![Operator::Move, Operator::Bite, Operator::Move]);
    }

    #[test]
    fn finished_rule_yields_to_the_next_once_it_exits() {
        let mut phenotype = phenotype("Do { Move } Do { Barf }");
        let mut body = Body::new();
        assert_eq!(phenotype.next(&mut body), Some(0));
        assert_eq!(phenotype.next(&mut body), Some(1));
        assert_eq!(phenotype.next(&mut body), Some(0));
        assert_eq!(body.actions, vec![Operator::Move, Operator::Barf, Operator::Move]);
    }

    #[test]
    fn higher_priority_rule_interrupts_then_yields() {
        let mut phenotype = phenotype("When { Me.Pain } Do { Barf } Do { Move, Move, Bite }");
        let mut body = Body::new();
        phenotype.next(&mut body);
        body.pain = true;
        phenotype.next(&mut body);
        body.pain = false;
        phenotype.next(&mut body);
        phenotype.next(&mut body);
        assert_eq!(
            body.actions,
            vec![Operator::Move, Operator::Barf, Operator::Move, Operator::Bite]
        );
    }

    #[test]
    fn conditions_cannot_act() {
        let mut phenotype = phenotype("When { Move, 0 } Do { Bite } Do { Mate }");
        let mut body = Body::new();
        assert_eq!(phenotype.next(&mut body), Some(1));
        assert_eq!(body.actions, vec![Operator::Mate]);
    }

    #[test]
    fn exited_rules_let_later_rules_run() {
        let mut phenotype = phenotype("Do { Turn 1 } Do { Move }");
        let mut body = Body::new();
        assert_eq!(phenotype.next(&mut body), Some(1));
        assert_eq!(body.actions, vec![Operator::Turn, Operator::Move]);
        phenotype.reset();
        assert!(phenotype.active().is_none());
    }
}
