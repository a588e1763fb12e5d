//! Change notifications and read-only views for external viewers.

use serde::{Deserialize, Serialize};
use zoe_lang::Point;

use crate::Cycle;
use crate::genotype::Color;

/// Something that changed during a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    BugBorn {
        serial: u64,
        mother: Option<u64>,
        position: Point,
    },
    BugMoved {
        serial: u64,
        position: Point,
    },
    BugEnergyChanged {
        serial: u64,
        diameter: f64,
        strength: f64,
    },
    BugDied {
        serial: u64,
        killer: Option<u64>,
    },
    /// The bug was eaten away and left the arena.
    BugRemoved {
        serial: u64,
    },
    JouleAdded {
        serial: u64,
        position: Point,
        energy: f64,
    },
    JouleRemoved {
        serial: u64,
    },
}

/// Living members of one species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub serial: u64,
    pub name: Option<String>,
    pub living: u32,
}

/// Totals recorded after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: Cycle,
    pub live: usize,
    pub dead: usize,
    pub species: usize,
    pub joules: usize,
    pub joule_energy: f64,
    pub bug_mass: f64,
    pub bug_strength: f64,
    pub births: usize,
    pub deaths: usize,
    pub top_species: Option<SpeciesCount>,
    pub invariant_violations: usize,
}

/// Observer notified as the world changes.
pub trait WorldObserver: Send {
    fn on_event(&mut self, _event: &WorldEvent) {}

    fn on_cycle(&mut self, _summary: &CycleSummary) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl WorldObserver for NullObserver {}

/// What a viewer needs to draw and label a bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugSnapshot {
    pub serial: u64,
    pub position: Point,
    pub color: Color,
    pub radius: f64,
    /// Strength as a fraction of the maximum at the current size.
    pub strength_fraction: f64,
    pub age: u64,
    pub species: u64,
    pub dead: bool,
    pub genealogy: String,
    pub living_descendants: usize,
    pub total_descendants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JouleSnapshot {
    pub serial: u64,
    pub position: Point,
    pub radius: f64,
    pub energy: f64,
}
