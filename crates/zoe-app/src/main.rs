use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use zoe_app::{format_summary, load_config, load_founders, parse_knob};
use zoe_core::{World, ZoeConfig};

#[derive(Parser, Debug)]
#[command(
    name = "zoe",
    version,
    about = "Run a Zoe world of evolving Zoel-programmed bugs without a viewer"
)]
struct Cli {
    /// JSON configuration file; fields left out keep their defaults.
    #[arg(long, env = "ZOE_CONFIG")]
    config: Option<PathBuf>,

    /// Founder genome files, or directories of `.zoe` files.
    #[arg(long = "genome", value_name = "PATH")]
    genomes: Vec<PathBuf>,

    /// Overrides a configuration knob, e.g. `--set vision_range=45`.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    knobs: Vec<String>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Cycles to run.
    #[arg(long, default_value_t = 1_000)]
    cycles: u64,

    /// Algae bugs added to the initial population.
    #[arg(long, default_value_t = 0)]
    algae: usize,

    /// Log a summary every this many cycles; 0 logs only the last.
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Trace every instruction and action.
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut world = bootstrap_world(&cli)?;
    run(&mut world, cli.cycles, cli.report_every);
    report_species(&world);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_config(cli: &Cli) -> Result<ZoeConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ZoeConfig::default(),
    };
    let mut knobs: Vec<(String, Value)> = Vec::new();
    if let Some(seed) = cli.seed {
        knobs.push(("seed".to_owned(), Value::from(seed)));
    }
    if let Some(width) = cli.width {
        knobs.push(("world_width".to_owned(), Value::from(width)));
    }
    if let Some(height) = cli.height {
        knobs.push(("world_height".to_owned(), Value::from(height)));
    }
    if cli.trace {
        knobs.push(("trace".to_owned(), Value::Bool(true)));
    }
    for raw in &cli.knobs {
        knobs.push(parse_knob(raw)?);
    }
    config
        .apply_knobs(knobs)
        .context("failed to apply configuration overrides")?;
    Ok(config)
}

fn bootstrap_world(cli: &Cli) -> Result<World> {
    let config = build_config(cli)?;
    let mut world = World::new(config).context("failed to create world")?;
    let founded = load_founders(&mut world, &cli.genomes)?;
    if founded == 0 && !cli.genomes.is_empty() {
        warn!("no founder genome could be loaded; seeding random species");
    }
    world.seed_population();
    for _ in 0..cli.algae {
        world.spawn_algae();
    }
    info!(
        width = world.config().world_width,
        height = world.config().world_height,
        bugs = world.population().len(),
        founders = founded,
        "Starting Zoe simulation"
    );
    Ok(world)
}

fn run(world: &mut World, cycles: u64, report_every: u64) {
    for done in 1..=cycles {
        let summary = world.step();
        if done == cycles || (report_every > 0 && done % report_every == 0) {
            info!("{}", format_summary(&summary));
        }
        if summary.live == 0 {
            info!(cycle = summary.cycle.0, "every bug has died");
            break;
        }
    }
}

fn report_species(world: &World) {
    for entry in world.species_scoreboard(10) {
        let label = entry
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", entry.serial));
        info!(species = %label, living = entry.living, "final standing");
    }
}
