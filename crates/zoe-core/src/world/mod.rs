//! The arena: owns every bug, joule and species and runs the cycle loop.

use rand::{Rng, rngs::SmallRng};
use serde_json::Value;
use slotmap::SlotMap;
use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};
use std::fmt;
use tracing::{debug, error};
use zoe_lang::{Literal, Memory, Point, parse_rules};

use crate::config::ZoeConfig;
use crate::genome::GeneFactory;
use crate::genotype::Genotype;
use crate::observer::{CycleSummary, NullObserver, WorldEvent, WorldObserver};
use crate::organism::{Bug, Joule, ZObject, max_strength_of};
use crate::phenotype::Phenotype;
use crate::{BugId, Cycle, GenotypeId, InvariantViolation, JouleId, WorldError};

mod actions;
mod birth;
mod genealogy;
mod host;
mod perception;
mod registers;
mod stats;

use host::BugHost;

/// Where and how big to place a bug seeded by hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point,
    /// Initial heading and course; random when `None`.
    pub heading: Option<f64>,
    pub diameter: f64,
    /// Stored strength; full when `None`.
    pub strength: Option<f64>,
}

/// Creation counters for serial numbers.
#[derive(Debug, Clone, Default)]
struct Serials {
    bugs: u64,
    joules: u64,
    genotypes: u64,
}

impl Serials {
    fn next_bug(&mut self) -> u64 {
        self.bugs += 1;
        self.bugs
    }

    fn next_joule(&mut self) -> u64 {
        self.joules += 1;
        self.joules
    }

    fn next_genotype(&mut self) -> u64 {
        self.genotypes += 1;
        self.genotypes
    }
}

/// Toroidal world holding the population and its energy field.
pub struct World {
    config: ZoeConfig,
    cycle: Cycle,
    rng: SmallRng,
    genes: GeneFactory,
    bugs: SlotMap<BugId, Bug>,
    joules: SlotMap<JouleId, Joule>,
    genotypes: SlotMap<GenotypeId, Genotype>,
    /// In-world bugs in scheduling order.
    population: Vec<BugId>,
    /// Joules in scan order.
    joule_order: Vec<JouleId>,
    /// Bugs born during the current pass.
    newborns: Vec<BugId>,
    in_pass: bool,
    founders: Vec<GenotypeId>,
    algae: Option<GenotypeId>,
    serials: Serials,
    observer: Box<dyn WorldObserver>,
    births: usize,
    deaths: usize,
    violations: usize,
    energy_photosynthesized: f64,
    history: VecDeque<CycleSummary>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("cycle", &self.cycle)
            .field("population", &self.population.len())
            .field("joules", &self.joule_order.len())
            .field("genotypes", &self.genotypes.len())
            .finish()
    }
}

impl World {
    /// An empty world; call [`World::seed_population`] to fill it.
    pub fn new(config: ZoeConfig) -> Result<Self, WorldError> {
        Self::with_observer(config, Box::new(NullObserver))
    }

    pub fn with_observer(
        config: ZoeConfig,
        observer: Box<dyn WorldObserver>,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let genes = GeneFactory::new(config.tree_bias(), config.expression_mutation_freq);
        Ok(Self {
            config,
            cycle: Cycle::first(),
            rng,
            genes,
            bugs: SlotMap::with_key(),
            joules: SlotMap::with_key(),
            genotypes: SlotMap::with_key(),
            population: Vec::new(),
            joule_order: Vec::new(),
            newborns: Vec::new(),
            in_pass: false,
            founders: Vec::new(),
            algae: None,
            serials: Serials::default(),
            observer,
            births: 0,
            deaths: 0,
            violations: 0,
            energy_photosynthesized: 0.0,
            history: VecDeque::new(),
        })
    }

    pub fn set_observer(&mut self, observer: Box<dyn WorldObserver>) {
        self.observer = observer;
    }

    /// Registers a named species from Zoel source. Founders seed the
    /// initial population.
    pub fn found_species(&mut self, name: &str, source: &str) -> Result<GenotypeId, WorldError> {
        let rules = parse_rules(source)?;
        let genome = self.genes.genome_from_rules(rules)?;
        let serial = self.serials.next_genotype();
        let id = self.genotypes.insert(Genotype::founder(serial, name, genome));
        self.founders.push(id);
        debug!(species = serial, name, "founded species");
        Ok(id)
    }

    /// Places the initial bugs and joules. Founders take turns filling the
    /// initial population; without founders every bug gets a random
    /// species.
    pub fn seed_population(&mut self) {
        let count = self.config.initial_bug_count();
        for i in 0..count {
            if self.founders.is_empty() {
                self.spawn_random_bug();
            } else {
                let genotype = self.founders[i % self.founders.len()];
                self.spawn_founder(genotype);
            }
        }
        let area = f64::from(self.config.world_width) * f64::from(self.config.world_height);
        let joules = (self.config.new_joules_per_cycle_per_pixel * area * 2000.0) as usize;
        for _ in 0..joules {
            self.spawn_random_joule();
        }
        debug!(bugs = count, joules, "seeded population");
    }

    /// A newborn-sized member of `genotype` at a random spot.
    pub fn spawn_founder(&mut self, genotype: GenotypeId) -> Option<BugId> {
        let is_algae = self.genotypes.get(genotype)?.is_algae();
        let torus = self.config.torus();
        let mut position = self.random_position();
        let randomness = self.config.plankton_distribution_randomness;
        if is_algae && randomness < 1.0 {
            let distance = self.config.arena_radius() * randomness * self.rng.random::<f64>();
            let direction = self.rng.random::<f64>() * PI;
            position = torus.wrap(torus.midpoint().offset(direction, distance));
        }
        let energy = self.config.min_newborn_energy();
        let diameter = (4.0 * energy / PI).sqrt();
        Some(self.create_bug(
            genotype,
            Placement {
                position,
                heading: None,
                diameter,
                strength: Some(energy),
            },
            None,
        ))
    }

    /// Plankton: a random size and strength and, unless founders exist, a
    /// brand new random species.
    pub fn spawn_random_bug(&mut self) -> BugId {
        let position = self.random_position();
        let min = self.config.bug_min_size;
        let spread = (self.config.bug_max_size - min).max(1.0) as u32;
        let diameter = min + f64::from(self.rng.random_range(0..spread) / 2);
        let strength = self.rng.random::<f64>() * max_strength_of(diameter);
        let genotype = if self.founders.is_empty() {
            let serial = self.serials.next_genotype();
            let max_genes = self.config.max_genes_of_random_species as usize;
            let genotype = Genotype::random(serial, &mut self.genes, &mut self.rng, max_genes);
            self.genotypes.insert(genotype)
        } else {
            self.founders[self.rng.random_range(0..self.founders.len())]
        };
        self.create_bug(
            genotype,
            Placement {
                position,
                heading: None,
                diameter,
                strength: Some(strength),
            },
            None,
        )
    }

    /// One member of the built-in algae species.
    pub fn spawn_algae(&mut self) -> Option<BugId> {
        let algae = match self.algae {
            Some(id) => id,
            None => {
                let serial = self.serials.next_genotype();
                let id = self
                    .genotypes
                    .insert(Genotype::algae(serial, &mut self.genes));
                self.algae = Some(id);
                id
            }
        };
        self.spawn_founder(algae)
    }

    /// Places a bug of `genotype` exactly as described.
    pub fn spawn_with(
        &mut self,
        genotype: GenotypeId,
        placement: Placement,
    ) -> Result<BugId, WorldError> {
        if !self.genotypes.contains_key(genotype) {
            return Err(WorldError::UnknownGenotype);
        }
        let placement = Placement {
            position: self.config.torus().wrap(placement.position),
            ..placement
        };
        Ok(self.create_bug(genotype, placement, None))
    }

    /// Adds a joule; returns its id.
    pub fn spawn_joule(&mut self, position: Point, energy: f64) -> JouleId {
        let serial = self.serials.next_joule();
        let position = self.config.torus().wrap(position);
        let id = self.joules.insert(Joule::new(serial, position, energy));
        self.joule_order.push(id);
        self.observer.on_event(&WorldEvent::JouleAdded {
            serial,
            position,
            energy,
        });
        id
    }

    fn spawn_random_joule(&mut self) -> JouleId {
        let position = self.random_position();
        let energy = self.rng.random::<f64>() * self.config.max_joule;
        self.spawn_joule(position, energy)
    }

    fn random_position(&mut self) -> Point {
        Point::new(
            self.rng.random::<f64>() * f64::from(self.config.world_width),
            self.rng.random::<f64>() * f64::from(self.config.world_height),
        )
    }

    /// Builds a bug and hands it to the world. Mid-pass arrivals wait in
    /// the newborn buffer until the pass ends.
    fn create_bug(
        &mut self,
        genotype: GenotypeId,
        placement: Placement,
        parents: Option<(BugId, Option<BugId>)>,
    ) -> BugId {
        let course = self.rng.random::<f64>() * TAU;
        let gaze = course + self.rng.random::<f64>() * PI / 2.0 - PI / 4.0;
        let diameter = placement.diameter.max(0.0);
        let strength = placement
            .strength
            .unwrap_or_else(|| max_strength_of(diameter))
            .max(0.0);
        let (species, color, algae, phenotype) = match self.genotypes.get_mut(genotype) {
            Some(record) => {
                record.add_member(placement.position);
                (
                    record.serial(),
                    record.color(),
                    record.is_algae(),
                    Phenotype::express(record.genome()),
                )
            }
            None => (0, [0; 3], false, Phenotype::default()),
        };
        let mut bug = Bug {
            serial: self.serials.next_bug(),
            position: placement.position,
            diameter,
            strength,
            heading: 0.0,
            course: 0.0,
            gaze: 0.0,
            age: 0,
            birth_cycle: self.cycle,
            death_cycle: None,
            birthplace: placement.position,
            genotype,
            species,
            color,
            algae,
            memory: Memory::new(),
            mood: Literal::ZERO,
            phenotype,
            mother: parents.map(|(mother, _)| mother),
            father: parents.and_then(|(_, father)| father),
            last_mate: None,
            last_biter: None,
            killer: None,
            kills: 0,
            children: Vec::new(),
            last_sensed: None,
            last_looked: None,
            bitten_since_last_turn: 0.0,
            mass_energy_after_last_turn: 0.0,
            in_world: true,
        };
        let heading = placement.heading.unwrap_or(course);
        bug.set_course(heading);
        bug.set_heading(heading);
        bug.set_gaze(if placement.heading.is_some() { 0.0 } else { gaze });
        bug.mass_energy_after_last_turn = bug.mass_energy();
        let serial = bug.serial;
        let position = bug.position;
        let mother = parents.and_then(|(mother, _)| self.bugs.get(mother)).map(|m| m.serial);
        let id = self.bugs.insert(bug);
        self.births += 1;
        if self.in_pass {
            self.newborns.push(id);
        } else {
            self.population.push(id);
        }
        self.observer.on_event(&WorldEvent::BugBorn {
            serial,
            mother,
            position,
        });
        id
    }

    /// Runs one full cycle and returns its summary.
    pub fn step(&mut self) -> CycleSummary {
        self.births = 0;
        self.deaths = 0;
        self.violations = 0;

        self.stage_turns();
        self.stage_commit_newborns();
        self.cycle = self.cycle.next();
        self.stage_plankton();
        self.stage_joules();
        self.stage_garbage_collection();
        self.stage_summary()
    }

    /// Runs `cycles` cycles.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    fn stage_turns(&mut self) {
        self.in_pass = true;
        let roster = self.population.clone();
        for id in roster {
            let Some(bug) = self.bugs.get(id) else {
                continue;
            };
            if bug.is_gone() {
                self.remove_from_world(id);
                continue;
            }
            self.take_turn(id);
        }
        let bugs = &self.bugs;
        self.population
            .retain(|id| bugs.get(*id).is_some_and(|bug| bug.in_world));
        self.in_pass = false;
    }

    fn stage_commit_newborns(&mut self) {
        let newborns = std::mem::take(&mut self.newborns);
        self.population.extend(newborns);
    }

    fn stage_plankton(&mut self) {
        let chance = self.config.new_plankton_per_cycle_per_pixel * self.config.arena_area();
        if chance > 0.0 && self.rng.random::<f64>() < chance {
            self.spawn_random_bug();
        }
    }

    fn stage_joules(&mut self) {
        let chance = self.config.new_joules_per_cycle_per_pixel * self.config.arena_area();
        if chance > 0.0 && self.rng.random::<f64>() < chance {
            self.spawn_random_joule();
        }
        let joules = &self.joules;
        let (kept, eaten): (Vec<JouleId>, Vec<JouleId>) = self
            .joule_order
            .iter()
            .copied()
            .partition(|&id| joules.get(id).is_some_and(|joule| !joule.is_gone()));
        self.joule_order = kept;
        for id in eaten {
            if let Some(joule) = self.joules.remove(id) {
                self.observer
                    .on_event(&WorldEvent::JouleRemoved { serial: joule.serial });
            }
        }
    }

    fn stage_garbage_collection(&mut self) {
        let every = self.config.garbage_collection_freq;
        if every > 0 && self.cycle.0 % every == 0 {
            self.collect_garbage();
        }
    }

    fn stage_summary(&mut self) -> CycleSummary {
        let summary = self.summary();
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        if self.config.history_capacity > 0 {
            self.history.push_back(summary.clone());
        }
        self.observer.on_cycle(&summary);
        summary
    }

    /// One bug's turn. The dead only drift.
    fn take_turn(&mut self, id: BugId) {
        let min_size = self.config.bug_min_size;
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        if bug.is_dead(min_size) {
            if bug.death_cycle.is_none() {
                self.declare_death(id);
            }
            self.drift(id);
            return;
        }
        bug.age += 1;
        self.photosynthesize(id);
        if self.spontaneous_split(id).is_none() {
            self.run_genome(id);
        }
        let max_turn = self.config.max_turn_per_cycle;
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.mass_energy_after_last_turn = bug.mass_energy();
            bug.bitten_since_last_turn = 0.0;
            bug.turn_towards_course(max_turn);
        }
        self.drift(id);
        self.check_invariants(id);
        if let Some(bug) = self.bugs.get(id) {
            let event = WorldEvent::BugMoved {
                serial: bug.serial,
                position: bug.position,
            };
            self.observer.on_event(&event);
        }
        self.emit_energy(id);
    }

    fn run_genome(&mut self, id: BugId) {
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        let mut phenotype = std::mem::take(&mut bug.phenotype);
        {
            let mut host = BugHost::new(self, id);
            phenotype.next(&mut host);
        }
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.phenotype = phenotype;
        }
    }

    fn photosynthesize(&mut self, id: BugId) {
        let solar = self.config.solar_joules_per_unit_body_area_per_cycle;
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        let income = solar * bug.radius() * bug.radius() * PI;
        if income > 0.0 {
            bug.grow(income);
            self.energy_photosynthesized += income;
        }
    }

    /// `B/2 - uniform * B` for the configured motion `B`.
    fn brownian(&mut self) -> f64 {
        let b = self.config.brownian_motion_per_cycle;
        b / 2.0 - self.rng.random::<f64>() * b
    }

    /// Random jitter of heading, course and position.
    fn drift(&mut self, id: BugId) {
        let heading_jitter = self.brownian() * PI / 16.0;
        let course_jitter = self.brownian() * PI / 16.0;
        let dx = self.brownian();
        let dy = self.brownian();
        let torus = self.config.torus();
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.set_heading(bug.heading + heading_jitter);
            bug.set_course(bug.course + course_jitter);
            bug.position = torus.wrap(Point::new(bug.position.x + dx, bug.position.y + dy));
        }
    }

    fn declare_death(&mut self, id: BugId) {
        let cycle = self.cycle;
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        if bug.death_cycle.is_some() {
            return;
        }
        bug.death_cycle = Some(cycle);
        let (serial, genotype, killer) = (bug.serial, bug.genotype, bug.killer);
        if let Some(species) = self.genotypes.get_mut(genotype) {
            species.remove_member();
        }
        self.deaths += 1;
        let killer = killer.and_then(|k| self.bugs.get(k)).map(|k| k.serial);
        debug!(bug = serial, ?killer, cycle = cycle.0, "bug died");
        self.observer
            .on_event(&WorldEvent::BugDied { serial, killer });
        self.prune_dead_subtrees(id);
    }

    /// Takes an eaten-away bug out of the schedule; its record stays for
    /// genealogy until garbage collection.
    fn remove_from_world(&mut self, id: BugId) {
        self.declare_death(id);
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.in_world = false;
            let serial = bug.serial;
            self.observer.on_event(&WorldEvent::BugRemoved { serial });
        }
    }

    fn check_invariants(&mut self, id: BugId) {
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        let violation = if !bug.strength.is_finite() || bug.strength < 0.0 {
            Some(InvariantViolation::Strength {
                serial: bug.serial,
                strength: bug.strength,
            })
        } else if !bug.diameter.is_finite() || bug.diameter < 0.0 {
            Some(InvariantViolation::Diameter {
                serial: bug.serial,
                diameter: bug.diameter,
            })
        } else {
            None
        };
        if let Some(violation) = violation {
            error!(cycle = self.cycle.0, %violation, "organism invariant broken");
            bug.strength = if bug.strength.is_finite() { bug.strength.max(0.0) } else { 0.0 };
            bug.diameter = if bug.diameter.is_finite() { bug.diameter.max(0.0) } else { 0.0 };
            bug.phenotype.reset();
            self.violations += 1;
        }
    }

    /// Applies named overrides to the live configuration. Arena dimensions
    /// are fixed once the world exists.
    pub fn apply_knobs<I, K>(&mut self, knobs: I) -> Result<(), WorldError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut next = self.config.clone();
        next.apply_knobs(knobs)?;
        if next.world_width != self.config.world_width
            || next.world_height != self.config.world_height
        {
            return Err(WorldError::InvalidKnob {
                name: "world_width/world_height".to_owned(),
                reason: "arena dimensions cannot change while the world runs".to_owned(),
            });
        }
        self.genes
            .set_bias(next.tree_bias(), next.expression_mutation_freq);
        self.config = next;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &ZoeConfig {
        &self.config
    }

    #[must_use]
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    #[must_use]
    pub fn bug(&self, id: BugId) -> Option<&Bug> {
        self.bugs.get(id)
    }

    /// In-world bugs in scheduling order, dead ones included.
    #[must_use]
    pub fn population(&self) -> &[BugId] {
        &self.population
    }

    /// Every bug record, including those kept only for genealogy.
    pub fn bugs(&self) -> impl Iterator<Item = (BugId, &Bug)> {
        self.bugs.iter()
    }

    #[must_use]
    pub fn joule(&self, id: JouleId) -> Option<&Joule> {
        self.joules.get(id)
    }

    pub fn joules(&self) -> impl Iterator<Item = (JouleId, &Joule)> {
        self.joule_order
            .iter()
            .filter_map(|&id| self.joules.get(id).map(|joule| (id, joule)))
    }

    #[must_use]
    pub fn genotype(&self, id: GenotypeId) -> Option<&Genotype> {
        self.genotypes.get(id)
    }

    pub fn genotypes(&self) -> impl Iterator<Item = (GenotypeId, &Genotype)> {
        self.genotypes.iter()
    }

    #[must_use]
    pub fn founders(&self) -> &[GenotypeId] {
        &self.founders
    }

    #[must_use]
    pub fn history(&self) -> &VecDeque<CycleSummary> {
        &self.history
    }

    /// Solar energy absorbed by all bugs so far.
    #[must_use]
    pub fn energy_photosynthesized(&self) -> f64 {
        self.energy_photosynthesized
    }

    #[must_use]
    pub fn is_alive(&self, id: BugId) -> bool {
        self.bugs
            .get(id)
            .is_some_and(|bug| bug.in_world && !bug.is_dead(self.config.bug_min_size))
    }
}
