//! Physical entities of the arena: bugs and the joules they eat.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use zoe_lang::geometry::{wrap_signed_angle, wrap_unsigned_angle};
use zoe_lang::{Literal, Memory, Point};

use crate::genotype::Color;
use crate::phenotype::Phenotype;
use crate::{BugId, Cycle, GenotypeId, JouleId};

/// Color of every joule.
pub const JOULE_COLOR: Color = [255, 0, 0];

/// What every object in the arena can report about itself.
pub trait ZObject {
    fn serial(&self) -> u64;
    fn position(&self) -> Point;
    /// Energy-equivalent physical size.
    fn mass(&self) -> f64;
    fn radius(&self) -> f64;
    fn color(&self) -> Color;

    /// Nothing left to eat or see.
    fn is_gone(&self) -> bool {
        self.mass() <= 0.0
    }
}

/// Something a bug perceived: the last object it looked at, bit, barfed,
/// or mated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sensed {
    Bug(BugId),
    Joule(JouleId),
}

/// A pellet of edible energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joule {
    pub(crate) serial: u64,
    pub(crate) position: Point,
    pub(crate) energy: f64,
}

impl Joule {
    #[must_use]
    pub fn new(serial: u64, position: Point, energy: f64) -> Self {
        Self {
            serial,
            position,
            energy: energy.max(0.0),
        }
    }

    #[must_use]
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Removes up to `bite` energy, returning what was actually taken.
    pub fn get_bitten(&mut self, bite: f64) -> f64 {
        let taken = bite.clamp(0.0, self.energy);
        self.energy -= taken;
        if self.energy <= 0.0 {
            self.energy = 0.0;
        }
        taken
    }
}

impl ZObject for Joule {
    fn serial(&self) -> u64 {
        self.serial
    }

    fn position(&self) -> Point {
        self.position
    }

    fn mass(&self) -> f64 {
        self.energy
    }

    fn radius(&self) -> f64 {
        self.energy.sqrt() / 2.0
    }

    fn color(&self) -> Color {
        JOULE_COLOR
    }
}

/// A living (or dead, not yet eaten) organism.
///
/// Genealogy links are arena ids; the world resolves them. A bug whose
/// diameter drops below the configured minimum is dead but keeps drifting
/// until it is eaten down to nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bug {
    pub(crate) serial: u64,
    pub(crate) position: Point,
    pub(crate) diameter: f64,
    pub(crate) strength: f64,
    pub(crate) heading: f64,
    pub(crate) course: f64,
    /// Direction of the last sensed object relative to the heading.
    pub(crate) gaze: f64,
    pub(crate) age: u64,
    pub(crate) birth_cycle: Cycle,
    pub(crate) death_cycle: Option<Cycle>,
    pub(crate) birthplace: Point,
    pub(crate) genotype: GenotypeId,
    pub(crate) species: u64,
    pub(crate) color: Color,
    pub(crate) algae: bool,
    pub(crate) memory: Memory,
    pub(crate) mood: Literal,
    pub(crate) phenotype: Phenotype,
    pub(crate) mother: Option<BugId>,
    pub(crate) father: Option<BugId>,
    pub(crate) last_mate: Option<BugId>,
    pub(crate) last_biter: Option<BugId>,
    pub(crate) killer: Option<BugId>,
    pub(crate) kills: u32,
    pub(crate) children: Vec<BugId>,
    pub(crate) last_sensed: Option<Sensed>,
    pub(crate) last_looked: Option<Cycle>,
    pub(crate) bitten_since_last_turn: f64,
    pub(crate) mass_energy_after_last_turn: f64,
    /// Still part of the scheduled population.
    pub(crate) in_world: bool,
}

/// Area of a circle of diameter `diameter`.
#[must_use]
pub fn mass_of(diameter: f64) -> f64 {
    PI * diameter * diameter / 4.0
}

/// Strength capacity of a bug of diameter `diameter`; equal to its mass.
#[must_use]
pub fn max_strength_of(diameter: f64) -> f64 {
    mass_of(diameter)
}

impl Bug {
    #[must_use]
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    #[must_use]
    pub fn strength(&self) -> f64 {
        self.strength
    }

    #[must_use]
    pub fn max_strength(&self) -> f64 {
        max_strength_of(self.diameter)
    }

    /// Fraction of full strength at the current size.
    #[must_use]
    pub fn strength_ratio(&self) -> f64 {
        let max = self.max_strength();
        if max > 0.0 { self.strength / max } else { 0.0 }
    }

    /// Mass plus stored strength: the total energy of the body.
    #[must_use]
    pub fn mass_energy(&self) -> f64 {
        self.mass() + self.strength
    }

    #[must_use]
    pub fn heading(&self) -> f64 {
        self.heading
    }

    #[must_use]
    pub fn course(&self) -> f64 {
        self.course
    }

    #[must_use]
    pub fn gaze(&self) -> f64 {
        self.gaze
    }

    #[must_use]
    pub fn age(&self) -> u64 {
        self.age
    }

    #[must_use]
    pub fn birth_cycle(&self) -> Cycle {
        self.birth_cycle
    }

    #[must_use]
    pub fn death_cycle(&self) -> Option<Cycle> {
        self.death_cycle
    }

    #[must_use]
    pub fn birthplace(&self) -> Point {
        self.birthplace
    }

    #[must_use]
    pub fn genotype(&self) -> GenotypeId {
        self.genotype
    }

    /// Serial of the bug's genotype.
    #[must_use]
    pub fn species(&self) -> u64 {
        self.species
    }

    #[must_use]
    pub fn is_algae(&self) -> bool {
        self.algae
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub fn mood(&self) -> &Literal {
        &self.mood
    }

    #[must_use]
    pub fn phenotype(&self) -> &Phenotype {
        &self.phenotype
    }

    #[must_use]
    pub fn mother(&self) -> Option<BugId> {
        self.mother
    }

    #[must_use]
    pub fn father(&self) -> Option<BugId> {
        self.father
    }

    #[must_use]
    pub fn last_mate(&self) -> Option<BugId> {
        self.last_mate
    }

    #[must_use]
    pub fn last_biter(&self) -> Option<BugId> {
        self.last_biter
    }

    #[must_use]
    pub fn killer(&self) -> Option<BugId> {
        self.killer
    }

    #[must_use]
    pub fn kills(&self) -> u32 {
        self.kills
    }

    #[must_use]
    pub fn children(&self) -> &[BugId] {
        &self.children
    }

    #[must_use]
    pub fn youngest_child(&self) -> Option<BugId> {
        self.children.last().copied()
    }

    #[must_use]
    pub fn last_sensed(&self) -> Option<Sensed> {
        self.last_sensed
    }

    #[must_use]
    pub fn is_in_world(&self) -> bool {
        self.in_world
    }

    #[must_use]
    pub fn is_dead(&self, min_size: f64) -> bool {
        self.diameter < min_size
    }

    /// Adds `extra` to strength, converting any overflow or deficit into a
    /// change of diameter that keeps mass plus strength constant.
    pub fn grow(&mut self, extra: f64) {
        self.strength += extra;
        if self.strength > 0.0 && self.strength < self.max_strength() {
            return;
        }
        let mass_energy = self.mass() + self.strength;
        if self.strength < 0.0 {
            self.diameter = (4.0 * mass_energy.max(0.0) / PI).sqrt();
            self.strength = 0.0;
        } else {
            self.diameter = 2.0 * (mass_energy / 2.0 / PI).sqrt();
            self.strength = self.max_strength();
        }
    }

    pub fn shrink(&mut self, amount: f64) {
        self.grow(-amount);
    }

    /// Energy one bite can take, proportional to the circumference.
    #[must_use]
    pub fn bite_size(&self, fraction_of_circumference: f64) -> f64 {
        self.diameter * PI * fraction_of_circumference
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = wrap_unsigned_angle(heading);
    }

    pub fn set_course(&mut self, course: f64) {
        self.course = wrap_unsigned_angle(course);
    }

    pub fn set_gaze(&mut self, gaze: f64) {
        self.gaze = wrap_signed_angle(gaze);
    }

    /// Swings the heading toward the course by at most `max_turn`.
    pub fn turn_towards_course(&mut self, max_turn: f64) {
        let turn = wrap_signed_angle(self.course - self.heading).clamp(-max_turn, max_turn);
        self.set_heading(self.heading + turn);
    }
}

impl ZObject for Bug {
    fn serial(&self) -> u64 {
        self.serial
    }

    fn position(&self) -> Point {
        self.position
    }

    fn mass(&self) -> f64 {
        mass_of(self.diameter)
    }

    fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    fn color(&self) -> Color {
        self.color
    }
}
