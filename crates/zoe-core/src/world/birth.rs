use rand::Rng;
use std::f64::consts::PI;
use tracing::debug;
use zoe_lang::Point;

use super::{Placement, World};
use crate::genotype::Genotype;
use crate::organism::{Sensed, ZObject};
use crate::{BugId, GenotypeId};

impl World {
    /// Creates a child of `mother` funded with `investment` energy. Half the
    /// investment becomes the child's body, half its strength; the mother
    /// pays for both at the configured birth efficiency.
    pub(crate) fn give_birth(
        &mut self,
        mother: BugId,
        father: Option<BugId>,
        investment: f64,
    ) -> Option<BugId> {
        let father = father.filter(|&father| father != mother && self.bugs.contains_key(father));
        let position = self.bugs.get(mother)?.position;
        let genotype = self.inherited_genotype(mother, father)?;
        let strength = investment / 2.0;
        let diameter = (4.0 * strength / PI).sqrt();
        let child = self.create_bug(
            genotype,
            Placement {
                position,
                heading: None,
                diameter,
                strength: Some(strength),
            },
            Some((mother, father)),
        );
        let efficiency = self.config.birth_efficiency;
        let birth_cost = self.bugs.get_mut(child).map_or(0.0, |baby| {
            baby.grow(0.0);
            (baby.strength + baby.mass()) / efficiency
        });
        if let Some(baby) = self.bugs.get_mut(child) {
            baby.mass_energy_after_last_turn = baby.mass_energy();
            baby.last_sensed = Some(Sensed::Bug(mother));
        }
        if let Some(mom) = self.bugs.get_mut(mother) {
            mom.shrink(birth_cost);
            mom.children.push(child);
            mom.last_sensed = Some(Sensed::Bug(child));
        }
        if self.config.trace {
            let serials = |id: BugId| self.bugs.get(id).map_or(0, |bug| bug.serial);
            debug!(
                mother = serials(mother),
                father = father.map(serials),
                child = serials(child),
                investment,
                "birth"
            );
        }
        Some(child)
    }

    /// Species of a new child. Children of one mating can share a species;
    /// an asexual child occasionally founds a mutant one.
    fn inherited_genotype(&mut self, mother: BugId, father: Option<BugId>) -> Option<GenotypeId> {
        let mom = self.bugs.get(mother)?;
        let mom_genotype = mom.genotype;
        let position = mom.position;
        match father {
            Some(dad) => {
                let sibling_genotype = if self.config.children_of_a_mating_share_genotype {
                    mom.youngest_child()
                        .and_then(|sibling| self.bugs.get(sibling))
                        .filter(|sibling| sibling.father == Some(dad))
                        .map(|sibling| sibling.genotype)
                        .filter(|genotype| self.genotypes.contains_key(*genotype))
                } else {
                    None
                };
                match sibling_genotype {
                    Some(shared) => Some(shared),
                    None => {
                        let dad_genotype = self.bugs.get(dad).map(|dad| dad.genotype);
                        self.derive_genotype(mom_genotype, dad_genotype, position)
                    }
                }
            }
            None => {
                if self.rng.random::<f64>() < self.config.mutant_children_freq {
                    self.derive_genotype(mom_genotype, None, position)
                } else {
                    Some(mom_genotype)
                }
            }
        }
    }

    fn derive_genotype(
        &mut self,
        mother: GenotypeId,
        father: Option<GenotypeId>,
        birthplace: Point,
    ) -> Option<GenotypeId> {
        let serial = self.serials.next_genotype();
        let mom = self.genotypes.get(mother)?;
        let dad = father.and_then(|father| self.genotypes.get(father));
        let genotype = Genotype::descendant(
            serial,
            mom,
            dad,
            birthplace,
            &mut self.genes,
            self.config.max_color_mutation,
            &mut self.rng,
        );
        debug!(
            species = serial,
            parent = mom.serial(),
            genes = genotype.genome().len(),
            "new species"
        );
        Some(self.genotypes.insert(genotype))
    }
}
