//! Startup plumbing for the headless Zoe runner: configuration files,
//! command-line knob overrides and founder species loaded from Zoel source.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};
use zoe_core::{CycleSummary, World, ZoeConfig};

/// File extension of Zoel founder genomes.
pub const GENOME_EXTENSION: &str = "zoe";

/// Reads a JSON configuration file. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<ZoeConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ZoeConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Splits a `name=value` override. The value is read as JSON when it
/// parses, otherwise it is kept as a raw string.
pub fn parse_knob(arg: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = arg.split_once('=') else {
        bail!("expected name=value, got {arg:?}");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("missing knob name in {arg:?}");
    }
    Ok((name.to_owned(), parse_value(raw.trim())))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Expands directories into the `.zoe` files they contain, sorted by name.
pub fn genome_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|file| {
                    file.is_file()
                        && file.extension().and_then(|ext| ext.to_str()) == Some(GENOME_EXTENSION)
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Founds one species per readable, parseable genome file and returns how
/// many were founded. Bad files are logged and skipped.
pub fn load_founders(world: &mut World, paths: &[PathBuf]) -> Result<usize> {
    let mut founded = 0;
    for file in genome_files(paths)? {
        let name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unnamed")
            .to_owned();
        let source = match fs::read_to_string(&file) {
            Ok(source) => source,
            Err(err) => {
                warn!(file = %file.display(), %err, "skipping unreadable genome");
                continue;
            }
        };
        match world.found_species(&name, &source) {
            Ok(_) => {
                info!(file = %file.display(), "founded species");
                founded += 1;
            }
            Err(err) => warn!(file = %file.display(), %err, "skipping genome"),
        }
    }
    Ok(founded)
}

/// One-line report of a cycle.
#[must_use]
pub fn format_summary(summary: &CycleSummary) -> String {
    let top = summary.top_species.as_ref().map_or_else(
        || "-".to_owned(),
        |top| match &top.name {
            Some(name) => format!("{name}={}", top.living),
            None => format!("#{}={}", top.serial, top.living),
        },
    );
    format!(
        "cycle {} live {} dead {} species {} joules {} ({:.1}) births {} deaths {} top {}",
        summary.cycle,
        summary.live,
        summary.dead,
        summary.species,
        summary.joules,
        summary.joule_energy,
        summary.births,
        summary.deaths,
        top
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn knobs_parse_json_with_string_fallback() {
        assert_eq!(
            parse_knob("vision_range=45.5").expect("knob"),
            ("vision_range".to_owned(), json!(45.5))
        );
        assert_eq!(
            parse_knob("trace = true").expect("knob"),
            ("trace".to_owned(), json!(true))
        );
        assert_eq!(
            parse_knob("name=hello").expect("knob"),
            ("name".to_owned(), json!("hello"))
        );
        assert!(parse_knob("vision_range").is_err());
        assert!(parse_knob("=3").is_err());
    }

    #[test]
    fn config_files_fill_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("zoe.json");
        fs::write(&path, r#"{ "world_width": 320, "seed": 7 }"#).expect("write");
        let config = load_config(&path).expect("config");
        assert_eq!(config.world_width, 320);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.world_height, ZoeConfig::default().world_height);

        fs::write(&path, r#"{ "world_width": 0 }"#).expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn founders_load_from_a_directory_and_skip_bad_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("Grazer.zoe"), "Do { Move }").expect("write");
        fs::write(dir.path().join("Broken.zoe"), "Do { Fly }").expect("write");
        fs::write(dir.path().join("notes.txt"), "not a genome").expect("write");

        let config = ZoeConfig {
            seed: Some(0xABCD),
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        let founded = load_founders(&mut world, &[dir.path().to_path_buf()]).expect("load");

        assert_eq!(founded, 1);
        let species = world.genotype(world.founders()[0]).expect("species");
        assert_eq!(species.name(), Some("Grazer"));
    }

    #[test]
    fn summaries_name_the_leading_species() {
        let config = ZoeConfig {
            seed: Some(0xABCD),
            initial_bug_count: Some(3),
            new_plankton_per_cycle_per_pixel: 0.0,
            expected_cycles_before_spontaneous_split: 0,
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        world.found_species("Grazer", "Do { Move }").expect("species");
        world.seed_population();
        let line = format_summary(&world.step());
        assert!(line.starts_with("cycle 2 live 3"));
        assert!(line.ends_with("top Grazer=3"));
    }
}
