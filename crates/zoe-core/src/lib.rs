//! Core simulation types for Zoe: organisms whose behaviour is a genome of
//! Zoel rules, evolving in a toroidal arena with an energy economy.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use thiserror::Error;
use zoe_lang::SyntaxError;

pub mod config;
pub mod genome;
pub mod genotype;
pub mod observer;
pub mod organism;
pub mod phenotype;
pub mod world;

pub use config::ZoeConfig;
pub use genome::{Gene, GeneFactory, Genome, Mutation, Recombination};
pub use genotype::{Color, Genotype};
pub use observer::{
    BugSnapshot, CycleSummary, JouleSnapshot, NullObserver, SpeciesCount, WorldEvent,
    WorldObserver,
};
pub use organism::{Bug, Joule, Sensed, ZObject};
pub use phenotype::{Phene, Phenotype, RuleHost};
pub use world::{Placement, World};

new_key_type! {
    /// Arena handle of a bug, live or kept for genealogy.
    pub struct BugId;
    /// Arena handle of an energy pellet.
    pub struct JouleId;
    /// Arena handle of a species record.
    pub struct GenotypeId;
}

/// Simulation clock. The first cycle is 1.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Cycle(pub u64);

impl Cycle {
    #[must_use]
    pub const fn first() -> Self {
        Self(1)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Cycles elapsed since `earlier`, zero if `earlier` is in the future.
    #[must_use]
    pub const fn since(self, earlier: Cycle) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Default for Cycle {
    fn default() -> Self {
        Self::first()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building or reconfiguring a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("unknown knob: {0}")]
    UnknownKnob(String),
    #[error("invalid value for knob {name}: {reason}")]
    InvalidKnob { name: String, reason: String },
    #[error("a genome needs at least one gene")]
    EmptyGenome,
    #[error("unknown genotype")]
    UnknownGenotype,
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// A broken organism invariant detected after a turn.
///
/// These point at a logic defect. The world logs them, repairs the
/// organism and keeps running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("bug {serial} has invalid strength {strength}")]
    Strength { serial: u64, strength: f64 },
    #[error("bug {serial} has invalid diameter {diameter}")]
    Diameter { serial: u64, diameter: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_start_at_one() {
        assert_eq!(Cycle::default(), Cycle(1));
        assert_eq!(Cycle::first().next(), Cycle(2));
        assert_eq!(Cycle(10).since(Cycle(4)), 6);
        assert_eq!(Cycle(3).since(Cycle(4)), 0);
    }

    #[test]
    fn syntax_errors_convert() {
        let err: WorldError = zoe_lang::parse_rules("Do {").expect_err("bad").into();
        assert!(matches!(err, WorldError::Syntax(_)));
    }
}
