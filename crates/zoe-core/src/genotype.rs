//! Species records and their display colors.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use zoe_lang::Point;

use crate::genome::{GeneFactory, Genome};

/// RGB display color.
pub type Color = [u8; 3];

/// Color of the built-in algae species.
pub const ALGAE_COLOR: Color = [0, 255, 0];

const FOUNDER_EXTENSION: &str = ".zoe";

/// Converts hue/saturation/brightness in `[0, 1]` to RGB.
#[must_use]
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Color {
    let channel = |value: f64| (value * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    if saturation <= 0.0 {
        let grey = channel(brightness);
        return [grey, grey, grey];
    }
    let h = (hue - hue.floor()) * 6.0;
    let f = h - h.floor();
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match h as u32 {
        0 => (brightness, t, p),
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        _ => (brightness, p, q),
    };
    [channel(r), channel(g), channel(b)]
}

/// Saturated color picked by the low byte of `key`.
#[must_use]
pub fn color_from_key(key: u64) -> Color {
    hsb_to_rgb((key % 256) as f64 / 256.0, 1.0, 0.7)
}

/// Stable color for a species name.
#[must_use]
pub fn color_from_name(name: &str) -> Color {
    let key = name
        .chars()
        .map(|c| u64::from(c) * u64::from(c))
        .fold(0u64, u64::wrapping_add);
    color_from_key(key)
}

/// Random walk of each channel by at most half of `max_mutation`.
pub fn mutate_color(color: Color, max_mutation: u32, rng: &mut dyn RngCore) -> Color {
    if max_mutation == 0 {
        return color;
    }
    let half = i64::from(max_mutation / 2);
    color.map(|channel| {
        let step = i64::from(rng.random_range(0..max_mutation)) - half;
        (i64::from(channel) + step).clamp(0, 255) as u8
    })
}

/// Channel-wise average of two colors.
#[must_use]
pub fn blend(a: Color, b: Color) -> Color {
    [0, 1, 2].map(|i| ((u16::from(a[i]) + u16::from(b[i])) / 2) as u8)
}

/// A species: a shared genome plus the bookkeeping of its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genotype {
    serial: u64,
    name: Option<String>,
    color: Color,
    parent_serial: Option<u64>,
    genome: Genome,
    birthplace: Option<Point>,
    living: u32,
    algae: bool,
}

impl Genotype {
    /// A species with a freshly generated random genome.
    pub fn random(
        serial: u64,
        genes: &mut GeneFactory,
        rng: &mut dyn RngCore,
        max_genes: usize,
    ) -> Self {
        let color = color_from_key(u64::from(rng.next_u32()));
        let genome = genes.random_genome(rng, max_genes);
        Self::with_genome(serial, None, color, genome)
    }

    /// A named species loaded from source text. A trailing `.zoe` is
    /// dropped from the name.
    #[must_use]
    pub fn founder(serial: u64, name: &str, genome: Genome) -> Self {
        let name = name.strip_suffix(FOUNDER_EXTENSION).unwrap_or(name);
        Self::with_genome(serial, Some(name.to_owned()), color_from_name(name), genome)
    }

    /// The green `Do { Split }` species used for plankton.
    pub fn algae(serial: u64, genes: &mut GeneFactory) -> Self {
        let genome = Genome::single(genes.split_gene());
        let mut algae = Self::with_genome(serial, Some("Algae".to_owned()), ALGAE_COLOR, genome);
        algae.algae = true;
        algae
    }

    /// A species derived from `mother`, and from `father` when the parents
    /// belong to different species.
    pub fn descendant(
        serial: u64,
        mother: &Genotype,
        father: Option<&Genotype>,
        birthplace: Point,
        genes: &mut GeneFactory,
        max_color_mutation: u32,
        rng: &mut dyn RngCore,
    ) -> Self {
        let father = father.filter(|father| father.serial != mother.serial);
        let (color, genome) = match father {
            None => (
                mutate_color(mother.color, max_color_mutation, rng),
                genes.inherit_asexual(&mother.genome, rng),
            ),
            Some(father) => (
                blend(mother.color, father.color),
                genes.inherit_sexual(&mother.genome, &father.genome, rng),
            ),
        };
        Self {
            parent_serial: Some(mother.serial),
            birthplace: Some(birthplace),
            ..Self::with_genome(serial, None, color, genome)
        }
    }

    fn with_genome(serial: u64, name: Option<String>, color: Color, genome: Genome) -> Self {
        Self {
            serial,
            name,
            color,
            parent_serial: None,
            genome,
            birthplace: None,
            living: 0,
            algae: false,
        }
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub fn parent_serial(&self) -> Option<u64> {
        self.parent_serial
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Where the first member entered the world.
    #[must_use]
    pub fn birthplace(&self) -> Option<Point> {
        self.birthplace
    }

    /// Members currently alive.
    #[must_use]
    pub fn living(&self) -> u32 {
        self.living
    }

    #[must_use]
    pub fn is_algae(&self) -> bool {
        self.algae
    }

    pub fn add_member(&mut self, at: Point) {
        self.birthplace.get_or_insert(at);
        self.living += 1;
    }

    pub fn remove_member(&mut self) {
        self.living = self.living.saturating_sub(1);
    }

    /// One-line header; a separator starting with a newline appends the
    /// genome, one gene per line.
    #[must_use]
    pub fn describe(&self, separator: &str) -> String {
        let mut out = format!("Species {}", self.serial);
        if let Some(name) = &self.name {
            out.push_str(&format!(" ({name})"));
        }
        if let Some(parent) = self.parent_serial {
            out.push_str(&format!(" parent={parent}"));
        }
        if separator.starts_with('\n') {
            out.push_str(separator);
            out.push_str(&self.genome.render(separator));
        }
        out
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use zoe_lang::{TreeBias, parse_rules};

    fn factory() -> GeneFactory {
        GeneFactory::new(TreeBias::default(), 0.0)
    }

    #[test]
    fn hsb_primaries() {
        assert_eq!(hsb_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsb_to_rgb(0.5, 1.0, 1.0), [0, 255, 255]);
        assert_eq!(hsb_to_rgb(0.5, 0.0, 0.5), [128, 128, 128]);
        assert_eq!(color_from_key(0), [179, 0, 0]);
        assert_eq!(color_from_key(256), color_from_key(0));
    }

    #[test]
    fn founder_name_drops_extension() {
        let mut genes = factory();
        let rules = parse_rules("Do { Move }").expect("parse");
        let genome = genes.genome_from_rules(rules).expect("genome");
        let founder = Genotype::founder(1, "Grazer.zoe", genome);
        assert_eq!(founder.name(), Some("Grazer"));
        assert_eq!(founder.color(), color_from_name("Grazer"));
        assert_eq!(founder.describe(" "), "Species 1 (Grazer)");
        assert_eq!(
            founder.describe("\n"),
            "Species 1 (Grazer)\nDo {\n    Move\n}"
        );
    }

    #[test]
    fn color_mutation_stays_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        let mut color = [250, 3, 128];
        for _ in 0..500 {
            let next = mutate_color(color, 10, &mut rng);
            for i in 0..3 {
                assert!((i16::from(next[i]) - i16::from(color[i])).abs() <= 5);
            }
            color = next;
        }
        assert_eq!(mutate_color([1, 2, 3], 0, &mut rng), [1, 2, 3]);
        assert_eq!(blend([0, 100, 255], [255, 100, 0]), [127, 100, 127]);
    }

    #[test]
    fn same_species_parents_breed_asexually() {
        let mut genes = factory();
        let mut rng = SmallRng::seed_from_u64(3);
        let mother = Genotype::random(1, &mut genes, &mut rng, 5);
        let child = Genotype::descendant(
            2,
            &mother,
            Some(&mother),
            Point::new(1.0, 2.0),
            &mut genes,
            0,
            &mut rng,
        );
        assert_eq!(child.color(), mother.color());
        assert_eq!(child.parent_serial(), Some(1));
        assert_eq!(child.birthplace(), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn membership_counts() {
        let mut genes = factory();
        let mut algae = Genotype::algae(1, &mut genes);
        assert!(algae.is_algae());
        assert_eq!(algae.color(), ALGAE_COLOR);
        algae.add_member(Point::new(3.0, 4.0));
        algae.add_member(Point::new(9.0, 9.0));
        assert_eq!(algae.living(), 2);
        assert_eq!(algae.birthplace(), Some(Point::new(3.0, 4.0)));
        algae.remove_member();
        algae.remove_member();
        algae.remove_member();
        assert_eq!(algae.living(), 0);
    }
}
