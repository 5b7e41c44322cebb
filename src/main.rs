//! Vet room - shared-room admission protocol simulation
//!
//! Loads a workload of dogs and cats, runs one task per animal through the
//! admission controller and reports the final room state.
//!
//! Module structure:
//! - `domain/` - Animals, signs, events, workload file
//! - `services/` - Room state, admission controller, simulation driver
//! - `infra/` - Config, metrics, logging
//! - `io/` - Event channel

use anyhow::Context;
use clap::Parser;
use tracing::info;
use vet_room::domain::Workload;
use vet_room::infra::{logging, Config};
use vet_room::services::Simulation;

/// Vet room - one room, two species, one species at a time
#[derive(Parser, Debug)]
#[command(name = "vet-room", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Workload JSON file (overrides the config file)
    #[arg(short, long)]
    workload: Option<String>,

    /// Wall-clock milliseconds per tick (overrides the config file)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Print the full report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config);
    if let Some(path) = args.workload {
        config = config.with_workload_file(path);
    }
    if let Some(tick_ms) = args.tick_ms {
        config = config.with_tick_ms(tick_ms.max(1));
    }

    logging::init(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        tick_ms = config.tick_ms(),
        workload_file = ?config.workload_file(),
        "vet_room_starting"
    );

    let workload = match config.workload_file() {
        Some(path) => Workload::from_file(path)?,
        None => Workload::demo(),
    };

    let report = Simulation::new(&config, workload).run().await?;

    if config.report_on_exit() {
        report.metrics.log();
    }
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    }

    info!(
        sign = %report.final_state.sign,
        dogs = report.final_state.dogs,
        cats = report.final_state.cats,
        stranded = report.stranded.len(),
        "vet_room_finished"
    );
    Ok(())
}
