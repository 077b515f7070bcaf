// this_file: src/main.rs
//! Surfpool CLI - drive a drawable pool from a JSON frame script

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::io::{self, Read};
use surfpool::logging::{self, Timer};
use surfpool::scenario::{self, Scenario, Simulator};
use surfpool::PoolConfig;

/// Surfpool - frame-synchronized drawable pool simulator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = logging::default_level())]
    log_level: String,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a frame script and print one JSON line per frame
    Simulate {
        /// Scenario file (uses stdin if not specified)
        #[arg(short, long)]
        input: Option<String>,

        /// Pool config file overriding the scenario's config
        #[arg(short, long)]
        config: Option<String>,

        /// Override the per-size free-list cap
        #[arg(long)]
        max_per_bucket: Option<usize>,

        /// Override the eviction age in frames
        #[arg(long)]
        max_age: Option<u32>,

        /// Print final pool stats to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Validate a frame script
    Validate {
        /// Input file (uses stdin if not specified)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_level, cli.quiet, true);

    match cli.command {
        Commands::Simulate {
            input,
            config,
            max_per_bucket,
            max_age,
            stats,
        } => {
            let mut scenario = load_scenario(input)?;
            scenario.config = resolve_config(scenario.config, config, max_per_bucket, max_age)?;
            simulate(&scenario, stats)?;
        }
        Commands::Validate { input } => {
            validate(input)?;
        }
        Commands::Version => {
            println!("surfpool version {}", surfpool::VERSION);
            println!("Frame-synchronized drawable pool");
        }
    }

    Ok(())
}

fn read_input(input: Option<String>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read scenario file {}", path)),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn load_scenario(input: Option<String>) -> Result<Scenario> {
    let json = read_input(input)?;
    match scenario::parse_scenario(&json) {
        Ok(scenario) => Ok(scenario),
        Err(e) => {
            error!("Failed to parse scenario: {}", e);
            Err(e.into())
        }
    }
}

/// Apply the config file, then individual flags, on top of the scenario's
/// own config
fn resolve_config(
    base: PoolConfig,
    config_path: Option<String>,
    max_per_bucket: Option<usize>,
    max_age: Option<u32>,
) -> Result<PoolConfig> {
    let mut config = match config_path {
        Some(path) => PoolConfig::from_file(&path)
            .with_context(|| format!("failed to load pool config {}", path))?,
        None => base,
    };
    if let Some(max_per_bucket) = max_per_bucket {
        config = config.with_max_per_bucket(max_per_bucket);
    }
    if let Some(max_age) = max_age {
        config = config.with_max_age(max_age);
    }
    config.validate()?;
    Ok(config)
}

fn simulate(scenario: &Scenario, print_stats: bool) -> Result<()> {
    let timer = Timer::new("simulation");
    info!(
        "Simulating {} frames (max_per_bucket={}, max_age={})",
        scenario.frames.len(),
        scenario.config.max_per_bucket,
        scenario.config.max_age
    );

    let mut simulator = Simulator::for_scenario(scenario)?;
    for frame in &scenario.frames {
        let outcome = simulator.step(frame)?;
        println!("{}", serde_json::to_string(&outcome)?);
    }

    if print_stats {
        let stats = simulator.pool().stats();
        eprintln!("SURFPOOL_STATS {}", serde_json::to_string(&stats)?);
    }
    info!(
        "Finished simulation in {:.3}ms ({})",
        timer.elapsed_ms(),
        simulator.pool().allocator().memory().stats()
    );
    Ok(())
}

fn validate(input: Option<String>) -> Result<()> {
    let json = read_input(input)?;
    match scenario::parse_scenario(&json) {
        Ok(scenario) => {
            println!("✓ Valid scenario");
            println!("  Frames: {}", scenario.frames.len());
            println!("  Max per bucket: {}", scenario.config.max_per_bucket);
            println!("  Max age: {}", scenario.config.max_age);
            Ok(())
        }
        Err(e) => {
            println!("✗ Invalid scenario: {}", e);
            Err(e.into())
        }
    }
}
