//! Actions a program can take, plus the involuntary ones the world imposes.

use rand::Rng;
use std::f64::consts::PI;
use tracing::trace;
use zoe_lang::{Literal, Operator, Turn};

use super::World;
use crate::{BugId, Cycle};
use crate::observer::WorldEvent;
use crate::organism::{Sensed, ZObject, max_strength_of};

impl World {
    /// Carries out `operator` for bug `id`. Turn-ending actions that did
    /// nothing let the program continue.
    pub(crate) fn perform_action(&mut self, id: BugId, operator: Operator, operand: &Literal) -> Turn {
        if self.config.trace {
            let serial = self.bugs.get(id).map_or(0, |bug| bug.serial);
            trace!(target: "zoe::actions", "{} {serial} {} {operand}", self.cycle, operator.name());
        }
        let acted = match operator {
            Operator::Move => {
                self.move_bug(id);
                true
            }
            Operator::Turn => {
                self.turn(id, operand);
                true
            }
            Operator::Bite => self.bite(id) > 0.0,
            Operator::Barf => self.barf(id) > 0.0,
            Operator::Mate => self.mate(id).is_some(),
            Operator::Spawn => self.spawn(id, operand.to_number()).is_some(),
            Operator::Split => self.split(id, operand.to_number()).is_some(),
            Operator::SenseFarther => {
                self.sense_farther(id);
                true
            }
            Operator::Mood => {
                if let Some(bug) = self.bugs.get_mut(id) {
                    bug.mood = operand.clone();
                }
                true
            }
            _ => true,
        };
        if acted && operator.is_turn_ending() {
            Turn::Finished
        } else {
            Turn::Continues
        }
    }

    /// One step forward along the heading, paid for in strength.
    pub(crate) fn move_bug(&mut self, id: BugId) {
        let swerve = self.brownian() * PI / 4.0;
        let noise = self.config.move_noise;
        let distance =
            self.config.base_move_distance + self.rng.random::<f64>() * 2.0 * noise - noise;
        let cost_per_mass = self.config.strength_to_move;
        let torus = self.config.torus();
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        bug.set_heading(bug.heading + swerve);
        bug.shrink(distance * distance * bug.mass() / 2.0 * cost_per_mass);
        bug.position = torus.wrap(bug.position.offset(bug.heading, distance));
    }

    /// Sets the course toward a location operand, or relative to the
    /// heading for a numeric one.
    fn turn(&mut self, id: BugId, operand: &Literal) {
        let torus = self.config.torus();
        let Some(bug) = self.bugs.get_mut(id) else {
            return;
        };
        match operand.as_point() {
            Some(destination) => bug.set_course(torus.bearing(bug.position, destination)),
            None => bug.set_course(bug.heading + operand.to_number()),
        }
    }

    /// Bites whatever touches the biter. Returns the energy taken.
    pub(crate) fn bite(&mut self, id: BugId) -> f64 {
        let Some(bug) = self.bugs.get(id) else {
            return 0.0;
        };
        let radius = bug.radius();
        let capacity = max_strength_of(self.config.bug_max_size) - bug.strength;
        let wanted = bug
            .bite_size(self.config.bite_fraction_of_own_circumference)
            .min(capacity)
            .max(0.0);
        let Some(target) = self.closest_object(id, radius, -1.0) else {
            return 0.0;
        };
        let efficiency = self.config.bite_efficiency;
        let min_size = self.config.bug_min_size;
        let bitten = match target {
            Sensed::Joule(joule) => self
                .joules
                .get_mut(joule)
                .map_or(0.0, |joule| joule.get_bitten(wanted)),
            Sensed::Bug(victim) => {
                let Some(prey) = self.bugs.get_mut(victim) else {
                    return 0.0;
                };
                let bitten = wanted.min(prey.strength + prey.mass()).max(0.0);
                let was_alive = !prey.is_dead(min_size);
                prey.shrink(bitten);
                prey.bitten_since_last_turn += bitten;
                prey.last_biter = Some(id);
                if was_alive && prey.is_dead(min_size) {
                    prey.killer = Some(id);
                    if let Some(biter) = self.bugs.get_mut(id) {
                        biter.kills += 1;
                    }
                }
                self.emit_energy(victim);
                bitten
            }
        };
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.last_sensed = Some(target);
            bug.grow(efficiency * bitten);
        }
        bitten
    }

    /// Dumps all stored strength as a joule at the bug's position. Returns
    /// the energy released.
    pub(crate) fn barf(&mut self, id: BugId) -> f64 {
        let Some(bug) = self.bugs.get_mut(id) else {
            return 0.0;
        };
        let energy = bug.strength;
        if energy <= 0.0 {
            return 0.0;
        }
        bug.strength = 0.0;
        let position = bug.position;
        let joule = self.spawn_joule(position, energy);
        if let Some(bug) = self.bugs.get_mut(id) {
            bug.last_sensed = Some(Sensed::Joule(joule));
        }
        energy
    }

    /// Picks the touching bug as the partner for future spawns.
    pub(crate) fn mate(&mut self, id: BugId) -> Option<BugId> {
        let radius = self.bugs.get(id)?.radius();
        let partner = self.closest_bug(id, radius, -1.0).map(|(partner, _)| partner);
        let bug = self.bugs.get_mut(id)?;
        bug.last_sensed = partner.map(Sensed::Bug);
        bug.last_mate = partner;
        partner
    }

    /// A child funded from stored strength, fathered by the last mate if
    /// there is one.
    pub(crate) fn spawn(&mut self, id: BugId, multiple: f64) -> Option<BugId> {
        if self.config.suppress_all_births {
            return None;
        }
        let minimum = self.config.min_newborn_energy();
        let investment = multiple * minimum;
        let bug = self.bugs.get(id)?;
        if investment < minimum || investment > bug.strength {
            return None;
        }
        let father = bug.last_mate;
        let child = self.give_birth(id, father, investment);
        self.forget_mate_after_birth(id, child.is_some());
        child
    }

    /// Divides the body in two.
    pub(crate) fn split(&mut self, id: BugId, multiple: f64) -> Option<BugId> {
        if self.config.suppress_all_births {
            return None;
        }
        let bug = self.bugs.get(id)?;
        let half = bug.mass_energy() / 2.0;
        if multiple * self.config.min_newborn_energy() > half {
            return None;
        }
        let father = bug.last_mate;
        let child = self.give_birth(id, father, half);
        self.forget_mate_after_birth(id, child.is_some());
        child
    }

    fn forget_mate_after_birth(&mut self, id: BugId, born: bool) {
        if born && self.config.forget_mate_after_first_child {
            if let Some(bug) = self.bugs.get_mut(id) {
                bug.last_mate = None;
            }
        }
    }

    /// Splits with a small chance per cycle once enough time has passed
    /// since the last child.
    pub(crate) fn spontaneous_split(&mut self, id: BugId) -> Option<BugId> {
        let chance = self.config.spontaneous_split_probability();
        if chance <= 0.0 {
            return None;
        }
        let bug = self.bugs.get(id)?;
        let most_recent_birth = bug
            .youngest_child()
            .and_then(|child| self.bugs.get(child))
            .map_or(Cycle(0), |child| child.birth_cycle);
        if self.cycle.since(most_recent_birth) < self.config.min_cycles_between_spontaneous_splits() {
            return None;
        }
        if self.rng.random::<f64>() >= chance {
            return None;
        }
        self.split(id, 1.0)
    }

    /// Looks again, past whatever was sensed last.
    fn sense_farther(&mut self, id: BugId) {
        let Some(bug) = self.bugs.get(id) else {
            return;
        };
        let min = match bug.last_sensed {
            None => -1.0,
            sensed => self.range_to(bug, sensed),
        };
        let vision = self.config.vision_range;
        self.look(id, vision, min);
    }

    pub(crate) fn emit_energy(&mut self, id: BugId) {
        if let Some(bug) = self.bugs.get(id) {
            let event = WorldEvent::BugEnergyChanged {
                serial: bug.serial,
                diameter: bug.diameter,
                strength: bug.strength,
            };
            self.observer.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoeConfig;
    use crate::world::Placement;
    use zoe_lang::Point;

    fn world() -> World {
        let config = ZoeConfig {
            seed: Some(0xABCD),
            world_width: 200,
            world_height: 200,
            brownian_motion_per_cycle: 0.0,
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        world.found_species("Sitter", "Do { EndTurn }").expect("species");
        world
    }

    fn place(world: &mut World, x: f64) -> BugId {
        let genotype = world.founders()[0];
        world
            .spawn_with(
                genotype,
                Placement {
                    position: Point::new(x, 100.0),
                    heading: Some(0.0),
                    diameter: 10.0,
                    strength: None,
                },
            )
            .expect("placed")
    }

    #[test]
    fn barf_turns_all_strength_into_a_joule() {
        let mut world = world();
        let bug = place(&mut world, 100.0);
        let strength = world.bug(bug).map(|bug| bug.strength()).expect("bug");

        let turn = world.perform_action(bug, Operator::Barf, &Literal::ZERO);

        assert_eq!(turn, Turn::Finished);
        let joules = world.joule_snapshots();
        assert_eq!(joules.len(), 1);
        assert_eq!(joules[0].energy, strength);
        assert_eq!(joules[0].position, Point::new(100.0, 100.0));
        let barfer = world.bug(bug).expect("bug");
        assert_eq!(barfer.strength(), 0.0);
        assert!(matches!(barfer.last_sensed(), Some(Sensed::Joule(_))));

        let again = world.perform_action(bug, Operator::Barf, &Literal::ZERO);
        assert_eq!(again, Turn::Continues);
        assert_eq!(world.joule_snapshots().len(), 1);
    }

    #[test]
    fn sense_farther_looks_past_the_last_thing_sensed() {
        let mut world = world();
        let viewer = place(&mut world, 100.0);
        let near = place(&mut world, 115.0);
        let far = place(&mut world, 125.0);
        let sensed = |world: &World| world.bug(viewer).and_then(|bug| bug.last_sensed());

        assert_eq!(world.look(viewer, 30.0, -1.0), Some(Sensed::Bug(near)));
        world.perform_action(viewer, Operator::SenseFarther, &Literal::ZERO);
        assert_eq!(sensed(&world), Some(Sensed::Bug(far)));
        world.perform_action(viewer, Operator::SenseFarther, &Literal::ZERO);
        assert_eq!(sensed(&world), None);
    }
}
