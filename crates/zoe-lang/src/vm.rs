//! Resumable stack machine.
//!
//! Evaluation is flattened onto an explicit frame stack so a program can
//! stop after any step and pick up on the next cycle exactly where it left
//! off. A [`Machine`] owns only its stacks; registers, memory, actions and
//! randomness come from the [`Host`] passed to every call.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::ast::{Block, Expression, Operation, Operator, Register, RegisterRef};
use crate::geometry::Torus;
use crate::literal::Literal;
use crate::operators::{self, Outcome};
use crate::stack::OperandStack;

/// Outcome of a resume request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    /// Work remains and the caller may keep stepping.
    Continues,
    /// A turn-ending action happened; resume on the next cycle.
    Finished,
    /// The program ran to completion.
    Exited,
}

/// Capabilities the machine calls into.
pub trait Host {
    fn read_register(&mut self, register: RegisterRef) -> Literal;

    /// Stored value, or numeric zero for unknown keys.
    fn read_memory(&mut self, key: &Literal) -> Literal;

    fn write_memory(&mut self, key: Literal, value: Literal);

    /// Carries out an action operator against the current stack top.
    /// Returns [`Turn::Continues`] when the action did nothing.
    fn perform_action(&mut self, operator: Operator, operand: &Literal) -> Turn;

    fn max_operand_stack_depth(&self) -> usize;

    fn max_steps_per_resume(&self) -> usize;

    fn random_source(&mut self) -> &mut dyn RngCore;

    /// Arena used when `Minus` measures the distance between locations.
    fn torus(&self) -> Torus;

    /// Operand evaluated for an operator written without one.
    fn implicit_operand(&self, operator: Operator) -> Option<Expression> {
        match operator {
            Operator::Turn => Some(Expression::Register(RegisterRef::me(Register::Toward))),
            Operator::Split | Operator::Spawn => Some(Expression::Number(1.0)),
            _ => None,
        }
    }

    /// Prefix for per-step trace lines; `None` disables tracing.
    fn trace_prefix(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Frame {
    /// Walking a block; `next` is the index of the next item to evaluate.
    Block { block: Block, next: usize },
    /// The operand of `operator` is being evaluated.
    Operation { operator: Operator, has_operand: bool },
}

/// One in-progress execution of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    stack: OperandStack,
    frames: Vec<Frame>,
}

impl Machine {
    #[must_use]
    pub fn new(program: &Block) -> Self {
        Self {
            stack: OperandStack::new(),
            frames: vec![Frame::Block {
                block: program.clone(),
                next: 0,
            }],
        }
    }

    #[must_use]
    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    /// Current stack top (zero when empty).
    #[must_use]
    pub fn top(&self) -> Literal {
        self.stack.top()
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.frames.is_empty()
    }

    /// Steps until something other than `Continues` happens, giving up with
    /// `Continues` once more steps than the host's budget have run. State is
    /// kept, so the next call carries on from the same frame.
    pub fn run(&mut self, host: &mut dyn Host) -> Turn {
        let budget = host.max_steps_per_resume();
        let mut steps = 0;
        loop {
            let turn = self.step(host);
            if turn != Turn::Continues {
                return turn;
            }
            steps += 1;
            if steps > budget {
                return Turn::Continues;
            }
        }
    }

    /// Advances the top frame by one unit of work.
    pub fn step(&mut self, host: &mut dyn Host) -> Turn {
        let Some(frame) = self.frames.last_mut() else {
            return Turn::Exited;
        };
        match frame {
            Frame::Block { block, next } => {
                let Some(expression) = block.get(*next).cloned() else {
                    self.frames.pop();
                    return Turn::Continues;
                };
                *next += 1;
                let depth = self.frames.len();
                let turn = self.evaluate(&expression, host);
                if self.frames.len() == depth && self.top_block_finished() {
                    self.frames.pop();
                }
                turn
            }
            Frame::Operation {
                operator,
                has_operand,
            } => {
                let (operator, has_operand) = (*operator, *has_operand);
                self.frames.pop();
                self.execute(operator, has_operand, host)
            }
        }
    }

    fn top_block_finished(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Block { block, next }) if *next >= block.len())
    }

    fn evaluate(&mut self, expression: &Expression, host: &mut dyn Host) -> Turn {
        if let Some(prefix) = host.trace_prefix() {
            let top: Vec<String> = self.stack.iter().take(5).map(ToString::to_string).collect();
            trace!(target: "zoel::vm", "{prefix} {expression} [{}]", top.join(", "));
        }
        match expression {
            Expression::Block(block) => {
                self.frames.push(Frame::Block {
                    block: block.clone(),
                    next: 0,
                });
                Turn::Continues
            }
            Expression::Operation(operation) => self.begin(operation, host),
            Expression::Register(register) => {
                let value = host.read_register(*register);
                self.stack.poke(value);
                Turn::Continues
            }
            Expression::Number(n) => {
                self.stack.poke(Literal::Number(*n));
                Turn::Continues
            }
            Expression::Text(s) => {
                self.stack.poke(Literal::Text(s.clone()));
                Turn::Continues
            }
        }
    }

    fn begin(&mut self, operation: &Operation, host: &mut dyn Host) -> Turn {
        let operator = operation.operator;
        let Some(operand) = operation.operand.as_deref() else {
            if let Some(implicit) = host.implicit_operand(operator) {
                if let Some(value) = implicit.as_literal() {
                    self.stack.poke(value);
                } else if let Expression::Register(register) = implicit {
                    let value = host.read_register(register);
                    self.stack.poke(value);
                }
            }
            return self.execute(operator, false, host);
        };

        let top_is_true = self.stack.top().is_true();
        if operator.skips_when_false() && !top_is_true {
            return Turn::Continues;
        }
        if operator.skips_when_true() && top_is_true {
            return Turn::Continues;
        }
        if operator.reserves_slot() {
            self.stack.push(Literal::ZERO, host.max_operand_stack_depth());
        }
        self.frames.push(Frame::Operation {
            operator,
            has_operand: true,
        });
        self.evaluate(operand, host)
    }

    fn execute(&mut self, operator: Operator, has_operand: bool, host: &mut dyn Host) -> Turn {
        let capacity = host.max_operand_stack_depth();
        if operator.is_binary() {
            let right = self.stack.pop();
            let left = self.stack.top();
            match operators::binary(operator, &left, &right, host.torus()) {
                Outcome::Replace(value) => self.stack.poke(value),
                Outcome::Extend(values) => {
                    for value in values {
                        self.stack.push(value, capacity);
                    }
                }
            }
            return Turn::Continues;
        }

        match operator {
            Operator::While => {
                if let Some(Frame::Block { next, .. }) = self.frames.last_mut() {
                    *next = next.saturating_sub(1);
                }
            }
            Operator::IfThen => {
                if let Some(Frame::Block { block, next }) = self.frames.last_mut() {
                    let else_follows = matches!(
                        block.get(*next),
                        Some(Expression::Operation(op)) if op.operator == Operator::Else
                    );
                    if else_follows {
                        *next += 1;
                    }
                }
            }
            Operator::Else => {}
            Operator::Push => {
                if !has_operand {
                    let top = self.stack.top();
                    self.stack.push(top, capacity);
                }
            }
            Operator::Pop => {
                self.stack.pop();
            }
            Operator::Set => {
                let key = self.stack.pop();
                let value = self.stack.top();
                host.write_memory(key, value);
            }
            Operator::Get => {
                let key = self.stack.pop();
                let value = host.read_memory(&key);
                self.stack.push(value, capacity);
            }
            Operator::Not => {
                let value = operators::not(&self.stack.top());
                self.stack.poke(value);
            }
            Operator::Negate => {
                let value = operators::negate(&self.stack.top());
                self.stack.poke(value);
            }
            Operator::AbsoluteVal => {
                let value = operators::absolute(&self.stack.top());
                self.stack.poke(value);
            }
            Operator::Random => {
                let modulus = self.stack.pop();
                let value = operators::random(&modulus, host.random_source());
                self.stack.push(value, capacity);
            }
            Operator::Print => {
                let value = self.stack.pop();
                let who = host.trace_prefix().unwrap_or_default();
                info!(target: "zoel::print", "{who} {value}");
            }
            Operator::Mood => {
                let value = self.stack.pop();
                host.perform_action(Operator::Mood, &value);
            }
            Operator::EndTurn => return Turn::Finished,
            action => {
                let operand = self.stack.top();
                let turn = host.perform_action(action, &operand);
                if action.is_turn_ending() {
                    return turn;
                }
            }
        }
        Turn::Continues
    }
}
