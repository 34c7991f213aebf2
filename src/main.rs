use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cogwork::{init_logging, parse_placements, Catalog, EngineConfig, Machine};
use log::{error, info};

/// Assemble a machine from a placement file and run it headless
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array of placed blocks
    placements: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 60)]
    frames: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let text = fs::read_to_string(&args.placements)
        .with_context(|| format!("reading {}", args.placements.display()))?;
    let blocks = parse_placements(&text).context("parsing placements")?;

    let mut machine = Machine::assemble(&blocks, Catalog::standard(), &config)
        .context("assembling machine")?;
    for _ in 0..args.frames {
        machine.step();
        for fault in machine.drain_faults() {
            error!("{fault}");
        }
    }
    for unit in machine.units() {
        for port in unit.output_names() {
            if let Some(value) = machine.value(unit.block_id(), port) {
                info!("{}.{port} = {value}", unit.block_id());
            }
        }
    }
    machine.teardown();
    Ok(())
}
