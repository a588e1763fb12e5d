use std::collections::HashMap;

use super::World;
use crate::observer::{BugSnapshot, CycleSummary, JouleSnapshot, SpeciesCount};
use crate::organism::ZObject;
use crate::{BugId, GenotypeId};

/// Ancestors listed in a snapshot's genealogy line.
const SNAPSHOT_GENERATIONS: usize = 5;

impl World {
    /// Totals for the current state of the arena.
    #[must_use]
    pub fn summary(&self) -> CycleSummary {
        let min_size = self.config.bug_min_size;
        let mut live = 0;
        let mut dead = 0;
        let mut bug_mass = 0.0;
        let mut bug_strength = 0.0;
        for bug in self.population.iter().filter_map(|&id| self.bugs.get(id)) {
            if bug.is_dead(min_size) {
                dead += 1;
            } else {
                live += 1;
            }
            bug_mass += bug.mass();
            bug_strength += bug.strength;
        }
        let (joules, joule_energy) = self
            .joules()
            .fold((0, 0.0), |(count, energy), (_, joule)| (count + 1, energy + joule.energy));
        CycleSummary {
            cycle: self.cycle,
            live,
            dead,
            species: self.species_count(),
            joules,
            joule_energy,
            bug_mass,
            bug_strength,
            births: self.births,
            deaths: self.deaths,
            top_species: self.species_scoreboard(1).into_iter().next(),
            invariant_violations: self.violations,
        }
    }

    fn living_by_species(&self) -> HashMap<GenotypeId, u32> {
        let min_size = self.config.bug_min_size;
        let mut counts = HashMap::new();
        for bug in self.population.iter().filter_map(|&id| self.bugs.get(id)) {
            if !bug.is_dead(min_size) {
                *counts.entry(bug.genotype).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Distinct species among living bugs.
    #[must_use]
    pub fn species_count(&self) -> usize {
        self.living_by_species().len()
    }

    /// Most populous species other than algae, largest first, ties broken
    /// by the older species.
    #[must_use]
    pub fn species_scoreboard(&self, limit: usize) -> Vec<SpeciesCount> {
        let mut board: Vec<SpeciesCount> = self
            .living_by_species()
            .into_iter()
            .filter_map(|(id, living)| {
                let genotype = self.genotypes.get(id)?;
                (!genotype.is_algae()).then(|| SpeciesCount {
                    serial: genotype.serial(),
                    name: genotype.name().map(str::to_owned),
                    living,
                })
            })
            .collect();
        board.sort_by(|a, b| b.living.cmp(&a.living).then(a.serial.cmp(&b.serial)));
        board.truncate(limit);
        board
    }

    #[must_use]
    pub fn bug_snapshot(&self, id: BugId) -> Option<BugSnapshot> {
        let bug = self.bugs.get(id)?;
        let (living_descendants, total_descendants) = self.descendant_counts(id);
        Some(BugSnapshot {
            serial: bug.serial,
            position: bug.position,
            color: bug.color,
            radius: bug.radius(),
            strength_fraction: bug.strength_ratio(),
            age: bug.age,
            species: bug.species,
            dead: bug.is_dead(self.config.bug_min_size),
            genealogy: self.genealogy(id, Some(SNAPSHOT_GENERATIONS), " "),
            living_descendants,
            total_descendants,
        })
    }

    /// Snapshots of every in-world bug, in scheduling order.
    #[must_use]
    pub fn bug_snapshots(&self) -> Vec<BugSnapshot> {
        self.population
            .iter()
            .filter_map(|&id| self.bug_snapshot(id))
            .collect()
    }

    #[must_use]
    pub fn joule_snapshots(&self) -> Vec<JouleSnapshot> {
        self.joules()
            .map(|(_, joule)| JouleSnapshot {
                serial: joule.serial,
                position: joule.position,
                radius: joule.radius(),
                energy: joule.energy,
            })
            .collect()
    }

    /// The bug record with `serial`, in the arena or kept for genealogy.
    #[must_use]
    pub fn bug_by_serial(&self, serial: u64) -> Option<BugId> {
        self.bugs
            .iter()
            .find(|(_, bug)| bug.serial == serial)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoeConfig;

    #[test]
    fn scoreboard_ranks_species_and_skips_algae() {
        let config = ZoeConfig {
            seed: Some(0xABCD),
            world_width: 300,
            world_height: 300,
            initial_bug_count: Some(5),
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        world.found_species("Many", "Do { EndTurn }").expect("species");
        world.found_species("Few", "Do { EndTurn }").expect("species");
        let many = world.founders()[0];
        world.seed_population();
        world.spawn_founder(many);
        for _ in 0..4 {
            world.spawn_algae();
        }

        let board = world.species_scoreboard(5);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name.as_deref(), Some("Many"));
        assert_eq!(board[0].living, 4);
        assert_eq!(board[1].living, 2);

        let summary = world.summary();
        assert_eq!(summary.live, 10);
        assert_eq!(summary.species, 3);
        assert_eq!(summary.top_species, Some(board[0].clone()));
        assert_eq!(world.bug_snapshots().len(), 10);
    }

    #[test]
    fn snapshots_describe_bugs_and_joules() {
        let config = ZoeConfig {
            seed: Some(0xABCD),
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        let id = world.spawn_random_bug();
        world.spawn_joule(zoe_lang::Point::new(3.0, 4.0), 16.0);

        let snapshot = world.bug_snapshot(id).expect("snapshot");
        let bug = world.bug(id).expect("bug");
        assert_eq!(snapshot.serial, bug.serial());
        assert_eq!(snapshot.radius, bug.diameter() / 2.0);
        assert!(!snapshot.dead);
        assert_eq!(snapshot.genealogy, "");
        assert_eq!(world.bug_by_serial(snapshot.serial), Some(id));

        let joules = world.joule_snapshots();
        assert_eq!(joules.len(), 1);
        assert_eq!(joules[0].radius, 2.0);
    }
}
