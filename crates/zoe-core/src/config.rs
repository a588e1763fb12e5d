//! World tunables and the named-knob override layer.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::f64::consts::PI;
use zoe_lang::{Torus, TreeBias};

use crate::WorldError;

/// Static configuration for a Zoe world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoeConfig {
    /// Optional RNG seed for reproducible worlds.
    pub seed: Option<u64>,
    /// Width of the arena in pixels.
    pub world_width: u32,
    /// Height of the arena in pixels.
    pub world_height: u32,
    /// Fixed founding population; `None` derives it from
    /// `initial_pixels_between_bugs`.
    pub initial_bug_count: Option<u32>,
    pub initial_pixels_between_bugs: u32,
    /// Upper bound on the genes of a randomly generated species.
    pub max_genes_of_random_species: u32,
    pub bug_max_size: f64,
    /// Bugs with a smaller diameter are dead.
    pub bug_min_size: f64,
    /// Largest energy of a randomly placed joule.
    pub max_joule: f64,
    /// Chance per pixel per cycle of a new joule; also sizes the initial
    /// joule field.
    pub new_joules_per_cycle_per_pixel: f64,
    /// Chance per pixel per cycle of a new random bug.
    pub new_plankton_per_cycle_per_pixel: f64,
    /// 1.0 scatters algae over the whole arena, 0.0 drops them at the centre.
    pub plankton_distribution_randomness: f64,
    pub solar_joules_per_unit_body_area_per_cycle: f64,
    pub brownian_motion_per_cycle: f64,
    /// Step budget of one program resume.
    pub max_thoughts_per_cycle: usize,
    /// Energy to move one unit of mass one pixel.
    pub strength_to_move: f64,
    pub base_move_distance: f64,
    pub max_turn_per_cycle: f64,
    pub vision_range: f64,
    /// Bite size as a fraction of the biter's circumference.
    pub bite_fraction_of_own_circumference: f64,
    pub bite_efficiency: f64,
    pub birth_efficiency: f64,
    pub move_noise: f64,
    /// Objects below this fraction of the viewer's mass are invisible.
    pub invisibility_threshold: f64,
    /// Bugs within this multiple of `bug_min_size` see everything.
    pub bigger_than_min_size_to_see_everything: f64,
    /// Mother and daughter ignore each other for this many cycles.
    pub split_invisibility_cycles: u64,
    /// Probability that an asexual child founds a mutant species.
    pub mutant_children_freq: f64,
    /// Mean cycles between spontaneous splits; 0 disables them.
    pub expected_cycles_before_spontaneous_split: u64,
    pub forget_mate_after_first_child: bool,
    pub children_of_a_mating_share_genotype: bool,
    /// Age per extra slot of stack and memory capacity.
    pub age_to_data_stack_limit: u64,
    pub newborn_data_stack_limit: usize,
    pub max_color_mutation: u32,
    pub suppress_all_births: bool,
    /// Cycles between garbage collections; 0 disables them.
    pub garbage_collection_freq: u64,
    /// Number of cycle summaries retained in memory.
    pub history_capacity: usize,
    /// Emit per-step interpreter traces.
    pub trace: bool,
    pub tree_bias: TreeBias,
    /// Probability that an inherited genome also gets a statement-level edit.
    pub expression_mutation_freq: f64,
}

impl Default for ZoeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            world_width: 1_200,
            world_height: 400,
            initial_bug_count: None,
            initial_pixels_between_bugs: 140,
            max_genes_of_random_species: 10,
            bug_max_size: 40.0,
            bug_min_size: 5.0,
            max_joule: 125.0,
            new_joules_per_cycle_per_pixel: 0.0,
            new_plankton_per_cycle_per_pixel: 0.000_000_01,
            plankton_distribution_randomness: 1.0,
            solar_joules_per_unit_body_area_per_cycle: 0.000_01,
            brownian_motion_per_cycle: 0.2,
            max_thoughts_per_cycle: 100,
            strength_to_move: 0.000_3,
            base_move_distance: 1.0,
            max_turn_per_cycle: PI / 16.0,
            vision_range: 30.0,
            bite_fraction_of_own_circumference: 0.01,
            bite_efficiency: 0.8,
            birth_efficiency: 0.95,
            move_noise: 0.1,
            invisibility_threshold: 0.3,
            bigger_than_min_size_to_see_everything: 1.8,
            split_invisibility_cycles: 100,
            mutant_children_freq: 0.2,
            expected_cycles_before_spontaneous_split: 5_000,
            forget_mate_after_first_child: false,
            children_of_a_mating_share_genotype: true,
            age_to_data_stack_limit: 100,
            newborn_data_stack_limit: 10,
            max_color_mutation: 90,
            suppress_all_births: false,
            garbage_collection_freq: 50_000,
            history_capacity: 256,
            trace: false,
            tree_bias: TreeBias::default(),
            expression_mutation_freq: 0.0,
        }
    }
}

fn probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl ZoeConfig {
    /// Checks every value is within its domain.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(WorldError::InvalidConfig(
                "world dimensions must be non-zero",
            ));
        }
        if self.initial_pixels_between_bugs == 0 {
            return Err(WorldError::InvalidConfig(
                "initial_pixels_between_bugs must be positive",
            ));
        }
        if self.max_genes_of_random_species == 0 {
            return Err(WorldError::InvalidConfig(
                "max_genes_of_random_species must be at least 1",
            ));
        }
        if !(self.bug_min_size > 0.0 && self.bug_max_size > self.bug_min_size) {
            return Err(WorldError::InvalidConfig(
                "bug sizes must satisfy 0 < bug_min_size < bug_max_size",
            ));
        }
        if !(self.max_joule > 0.0) {
            return Err(WorldError::InvalidConfig("max_joule must be positive"));
        }
        if self.new_joules_per_cycle_per_pixel < 0.0
            || self.new_plankton_per_cycle_per_pixel < 0.0
            || self.solar_joules_per_unit_body_area_per_cycle < 0.0
            || self.brownian_motion_per_cycle < 0.0
            || self.strength_to_move < 0.0
            || self.base_move_distance < 0.0
            || self.move_noise < 0.0
            || self.max_turn_per_cycle < 0.0
            || self.invisibility_threshold < 0.0
            || self.bigger_than_min_size_to_see_everything < 0.0
            || self.bite_fraction_of_own_circumference < 0.0
        {
            return Err(WorldError::InvalidConfig(
                "rates, distances and thresholds must be non-negative",
            ));
        }
        if !(self.vision_range > 0.0) {
            return Err(WorldError::InvalidConfig("vision_range must be positive"));
        }
        if !(self.bite_efficiency > 0.0 && self.bite_efficiency <= 1.0)
            || !(self.birth_efficiency > 0.0 && self.birth_efficiency <= 1.0)
        {
            return Err(WorldError::InvalidConfig(
                "bite and birth efficiency must be in (0, 1]",
            ));
        }
        if !probability(self.mutant_children_freq)
            || !probability(self.plankton_distribution_randomness)
            || !probability(self.expression_mutation_freq)
            || !probability(self.tree_bias.wild_operator_probability)
            || !probability(self.tree_bias.wild_register_probability)
        {
            return Err(WorldError::InvalidConfig(
                "frequencies and probabilities must be in [0, 1]",
            ));
        }
        if self.max_thoughts_per_cycle == 0 {
            return Err(WorldError::InvalidConfig(
                "max_thoughts_per_cycle must be positive",
            ));
        }
        if self.age_to_data_stack_limit == 0 || self.newborn_data_stack_limit == 0 {
            return Err(WorldError::InvalidConfig(
                "data stack limits must be positive",
            ));
        }
        if self.max_color_mutation > 255 {
            return Err(WorldError::InvalidConfig(
                "max_color_mutation cannot exceed 255",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history_capacity must be positive",
            ));
        }
        Ok(())
    }

    /// Applies named overrides on top of this configuration.
    ///
    /// Names are field names, with dots reaching into nested tables
    /// (`tree_bias.wild_operator_probability`). Strings are coerced into
    /// numbers and booleans where the field needs one. Either every knob
    /// applies and the result validates, or the configuration is left
    /// untouched.
    pub fn apply_knobs<I, K>(&mut self, knobs: I) -> Result<(), WorldError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut current = serde_json::to_value(&*self).map_err(|err| WorldError::InvalidKnob {
            name: "*".to_owned(),
            reason: err.to_string(),
        })?;
        for (name, value) in knobs {
            let name = name.as_ref();
            let slot = knob_slot(&mut current, name)?;
            *slot = coerce(slot, value).map_err(|reason| WorldError::InvalidKnob {
                name: name.to_owned(),
                reason,
            })?;
            serde_json::from_value::<ZoeConfig>(current.clone()).map_err(|err| {
                WorldError::InvalidKnob {
                    name: name.to_owned(),
                    reason: err.to_string(),
                }
            })?;
        }
        let updated: ZoeConfig =
            serde_json::from_value(current).map_err(|err| WorldError::InvalidKnob {
                name: "*".to_owned(),
                reason: err.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }

    #[must_use]
    pub fn torus(&self) -> Torus {
        Torus::new(f64::from(self.world_width), f64::from(self.world_height))
    }

    #[must_use]
    pub fn tree_bias(&self) -> TreeBias {
        self.tree_bias
    }

    /// Half the larger arena dimension.
    #[must_use]
    pub fn arena_radius(&self) -> f64 {
        f64::from(self.world_width.max(self.world_height)) / 2.0
    }

    /// Mass plus full strength of a bug at the minimum size.
    #[must_use]
    pub fn min_newborn_energy(&self) -> f64 {
        2.0 * PI * self.bug_min_size * self.bug_min_size / 4.0
    }

    /// Chance per cycle of a spontaneous split, chosen so that half of all
    /// bugs have split after the expected number of cycles.
    #[must_use]
    pub fn spontaneous_split_probability(&self) -> f64 {
        match self.expected_cycles_before_spontaneous_split {
            0 => 0.0,
            expected => 1.0 - 0.5_f64.powf(1.0 / expected as f64),
        }
    }

    #[must_use]
    pub fn min_cycles_between_spontaneous_splits(&self) -> u64 {
        self.expected_cycles_before_spontaneous_split / 2
    }

    #[must_use]
    pub fn initial_bug_count(&self) -> usize {
        match self.initial_bug_count {
            Some(count) => count as usize,
            None => {
                let area = u64::from(self.world_width) * u64::from(self.world_height);
                let spacing = u64::from(self.initial_pixels_between_bugs);
                (area / (spacing * spacing)) as usize
            }
        }
    }

    /// Stack and memory capacity of a bug of the given age.
    #[must_use]
    pub fn max_data_size(&self, age: u64) -> usize {
        let grown = usize::try_from(age / self.age_to_data_stack_limit).unwrap_or(usize::MAX);
        self.newborn_data_stack_limit.max(grown)
    }

    #[must_use]
    pub fn arena_area(&self) -> f64 {
        f64::from(self.world_width) * f64::from(self.world_height)
    }
}

fn knob_slot<'a>(root: &'a mut Value, name: &str) -> Result<&'a mut Value, WorldError> {
    let mut segments = name.split('.').filter(|s| !s.is_empty()).peekable();
    if segments.peek().is_none() {
        return Err(WorldError::UnknownKnob(name.to_owned()));
    }
    let mut cur = root;
    for segment in segments {
        cur = cur
            .as_object_mut()
            .and_then(|map: &mut Map<String, Value>| map.get_mut(segment))
            .ok_or_else(|| WorldError::UnknownKnob(name.to_owned()))?;
    }
    if cur.is_object() {
        return Err(WorldError::InvalidKnob {
            name: name.to_owned(),
            reason: "names a table, not a value".to_owned(),
        });
    }
    Ok(cur)
}

fn coerce(target: &Value, patch: Value) -> Result<Value, String> {
    match (target, patch) {
        (_, Value::Null) => Ok(Value::Null),
        (Value::Number(_), Value::Number(n)) => Ok(Value::Number(n)),
        (Value::Number(_), Value::String(s)) => {
            let s = s.trim();
            if target.is_u64() {
                s.parse::<u64>()
                    .map(Value::from)
                    .map_err(|_| format!("expected an unsigned integer, found '{s}'"))
            } else if target.is_i64() {
                s.parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("expected an integer, found '{s}'"))
            } else {
                let v: f64 = s
                    .parse()
                    .map_err(|_| format!("expected a number, found '{s}'"))?;
                serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .ok_or_else(|| format!("non-finite number '{s}'"))
            }
        }
        (Value::Bool(_), Value::Bool(b)) => Ok(Value::Bool(b)),
        (Value::Bool(_), Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            other => Err(format!("expected a boolean, found '{other}'")),
        },
        (Value::String(_), Value::String(s)) => Ok(Value::String(s)),
        (Value::Null, patch) => Ok(patch),
        (_, patch) => Err(format!("type mismatch: cannot use {patch}")),
    }
}
