use std::f64::consts::PI;
use zoe_lang::{Literal, Register, RegisterRef, Whose};

use super::World;
use crate::{BugId, JouleId};
use crate::organism::{Sensed, ZObject};

impl World {
    /// Value of `Me.<register>` or `It.<register>` for `id`. Registers about
    /// the surroundings trigger at most one fresh look per cycle.
    pub(crate) fn read_register(&mut self, id: BugId, register: RegisterRef) -> Literal {
        let needs_look = self
            .bugs
            .get(id)
            .is_some_and(|bug| bug.last_looked != Some(self.cycle));
        if needs_look && register.register.requires_looking() {
            let vision = self.config.vision_range;
            let sensed = self.look(id, vision, 0.0);
            if self.config.trace {
                let serial = self.bugs.get(id).map_or(0, |bug| bug.serial);
                tracing::trace!(
                    target: "zoe::rules",
                    "{} {serial} sensed {}",
                    self.cycle,
                    self.describe_sensed(sensed)
                );
            }
        }
        let Some(bug) = self.bugs.get(id) else {
            return Literal::ZERO;
        };
        let sensed = bug.last_sensed;
        let other = match sensed {
            Some(Sensed::Bug(other)) if self.bugs.contains_key(other) => Some(other),
            _ => None,
        };
        match register.whose {
            Whose::Me => self.evaluate(id, register.register, other),
            Whose::It => match (other, sensed) {
                (Some(other), _) if register.register.same_for_both() => {
                    self.evaluate(id, register.register, Some(other))
                }
                (Some(other), _) => self.evaluate(other, register.register, Some(id)),
                (None, Some(Sensed::Joule(joule))) => self.joule_register(joule, register.register),
                (None, _) => Literal::ZERO,
            },
        }
    }

    fn joule_register(&self, id: JouleId, register: Register) -> Literal {
        let Some(joule) = self.joules.get(id) else {
            return Literal::ZERO;
        };
        match register {
            Register::Location => Literal::from(joule.position),
            Register::Size => Literal::from(2.0 * joule.radius()),
            Register::Strength => Literal::from(joule.energy),
            _ => Literal::ZERO,
        }
    }

    /// A register of bug `id`, with `other` as the bug it is compared to.
    fn evaluate(&self, id: BugId, register: Register, other: Option<BugId>) -> Literal {
        let Some(me) = self.bugs.get(id) else {
            return Literal::ZERO;
        };
        let other_bug = other.and_then(|other| self.bugs.get(other));
        let min_size = self.config.bug_min_size;
        match register {
            Register::Cycle => Literal::from(self.cycle.0 as f64),
            Register::Id => Literal::from(me.serial as f64),
            Register::Age => Literal::from(me.age as f64),
            Register::Size => Literal::from(me.diameter),
            Register::Strength => Literal::from(me.strength),
            Register::Heading => match other_bug {
                Some(other) => Literal::from(me.heading - other.heading),
                None => Literal::from(me.heading),
            },
            Register::Location => Literal::from(me.position),
            Register::BirthLocation => Literal::from(me.birthplace),
            Register::AncestralLocation => Literal::from(
                self.genotypes
                    .get(me.genotype)
                    .and_then(|genotype| genotype.birthplace())
                    .unwrap_or(me.birthplace),
            ),
            Register::Species => Literal::from(me.species as f64),
            Register::Mood => me.mood.clone(),
            Register::Pain => Literal::truth(
                me.bitten_since_last_turn > 0.0
                    && me.mass_energy() < me.mass_energy_after_last_turn,
            ),
            Register::FeelSomething => {
                Literal::truth(self.range_to(me, me.last_sensed) - me.radius() <= 0.1)
            }
            Register::SeeSomething => {
                Literal::truth(self.range_to(me, me.last_sensed) <= self.config.vision_range)
            }
            Register::Toward => Literal::from(me.gaze),
            Register::Away => Literal::from(me.gaze + PI),
            Register::IsAlive => Literal::truth(!me.is_dead(min_size) && !me.algae),
            Register::Range => Literal::from(self.range_to(me, me.last_sensed) - me.radius()),
            Register::IsSameSpecies => Literal::truth(
                other_bug.is_some_and(|other| !other.is_dead(min_size) && other.genotype == me.genotype),
            ),
            Register::IsFamily => {
                Literal::truth(other.is_some_and(|other| self.is_family(id, other)))
            }
            Register::IsParent => {
                Literal::truth(other_bug.is_some_and(|other| other.mother == Some(id)))
            }
            Register::IsLastMate => {
                Literal::truth(other_bug.is_some_and(|other| other.last_mate == Some(id)))
            }
            Register::IsChild => Literal::truth(other.is_some() && me.mother == other),
            Register::IsAncestor => {
                Literal::truth(other.is_some_and(|other| self.is_descendant_of(other, id)))
            }
            Register::IsDescendent => {
                Literal::truth(other.is_some_and(|other| self.is_descendant_of(id, other)))
            }
        }
    }

    fn describe_sensed(&self, sensed: Option<Sensed>) -> String {
        match sensed {
            Some(Sensed::Bug(id)) => self
                .bugs
                .get(id)
                .map_or_else(|| "nothing".to_owned(), |bug| format!("bug {}", bug.serial)),
            Some(Sensed::Joule(id)) => self.joules.get(id).map_or_else(
                || "nothing".to_owned(),
                |joule| format!("joule {} ({:.1})", joule.serial, joule.energy),
            ),
            None => "nothing".to_owned(),
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
        world.found_species("Other", "Do { Move }").expect("species");
        world
    }

    fn place(world: &mut World, founder: usize, x: f64, heading: f64) -> BugId {
        let genotype = world.founders()[founder];
        world
            .spawn_with(
                genotype,
                Placement {
                    position: Point::new(x, 100.0),
                    heading: Some(heading),
                    diameter: 10.0,
                    strength: None,
                },
            )
            .expect("placed")
    }

    fn read(world: &mut World, id: BugId, word: &str) -> Literal {
        let register = RegisterRef::from_word(word).expect("register");
        world.read_register(id, register)
    }

    #[test]
    fn personal_registers() {
        let mut world = world();
        let me = place(&mut world, 0, 50.0, 1.0);
        assert_eq!(read(&mut world, me, "Me.Size"), Literal::from(10.0));
        assert_eq!(read(&mut world, me, "Me.Cycle"), Literal::from(1.0));
        assert_eq!(read(&mut world, me, "Me.Heading"), Literal::from(1.0));
        assert_eq!(
            read(&mut world, me, "Me.Location"),
            Literal::from("{ x=50.000, y=100.000 }")
        );
        assert_eq!(read(&mut world, me, "Me.IsAlive"), Literal::truth(true));
        assert_eq!(read(&mut world, me, "Me.Pain"), Literal::truth(false));
        assert!(!read(&mut world, me, "Me.SeeSomething").is_true());
        assert_eq!(read(&mut world, me, "It.Size"), Literal::ZERO);
    }

    #[test]
    fn it_registers_describe_the_sensed_bug() {
        let mut world = world();
        let me = place(&mut world, 0, 50.0, 1.0);
        let other = place(&mut world, 1, 70.0, 0.25);

        assert!(read(&mut world, me, "Me.SeeSomething").is_true());
        assert_eq!(world.bug(me).and_then(|bug| bug.last_sensed()), Some(Sensed::Bug(other)));
        assert_eq!(read(&mut world, me, "Me.Range"), Literal::from(10.0));
        assert_eq!(read(&mut world, me, "It.Heading"), Literal::from(0.25 - 1.0));
        assert_eq!(read(&mut world, me, "Me.Heading"), Literal::from(1.0 - 0.25));
        assert_eq!(read(&mut world, me, "It.IsSameSpecies"), Literal::truth(false));
        assert_eq!(read(&mut world, me, "It.IsFamily"), Literal::truth(false));
        let species = world.bug(other).map(|bug| bug.species() as f64).expect("other");
        assert_eq!(read(&mut world, me, "It.Species"), Literal::from(species));
        assert!(!read(&mut world, me, "Me.FeelSomething").is_true());
    }

    #[test]
    fn pain_follows_a_bite_that_costs_energy() {
        let mut world = world();
        let biter = place(&mut world, 1, 50.0, 0.0);
        let victim = place(&mut world, 0, 59.0, 0.0);
        assert_eq!(read(&mut world, victim, "Me.Pain"), Literal::truth(false));

        assert!(world.bite(biter) > 0.0);

        assert_eq!(read(&mut world, victim, "Me.Pain"), Literal::truth(true));
        assert_eq!(read(&mut world, biter, "Me.Pain"), Literal::truth(false));
    }

    #[test]
    fn it_registers_of_a_joule() {
        let mut world = world();
        let me = place(&mut world, 0, 50.0, 0.0);
        world.spawn_joule(Point::new(65.0, 100.0), 36.0);
        assert_eq!(read(&mut world, me, "It.Strength"), Literal::ZERO);
        assert!(read(&mut world, me, "Me.SeeSomething").is_true());
        assert_eq!(read(&mut world, me, "It.Strength"), Literal::from(36.0));
        assert_eq!(read(&mut world, me, "It.Size"), Literal::from(6.0));
        assert_eq!(read(&mut world, me, "It.IsAlive"), Literal::ZERO);
        assert_eq!(read(&mut world, me, "Me.Toward"), Literal::from(0.0));
    }
}
