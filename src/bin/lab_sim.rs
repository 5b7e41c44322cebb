//! Programmer lab simulation - exclusive compiler, shared database
//!
//! Usage:
//!   cargo run --bin lab-sim -- --programmers 5 --rounds 3

use clap::Parser;
use vet_room::infra::{logging, Config};
use vet_room::services::lab::run_lab;

#[derive(Parser, Debug)]
#[command(name = "lab-sim", version, about = "Compiler/database permit simulation")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Number of programmers (overrides the config file)
    #[arg(long)]
    programmers: Option<usize>,

    /// Compilations per programmer (overrides the config file)
    #[arg(long)]
    rounds: Option<usize>,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);
    logging::init(&config);

    let mut lab = config.lab().clone();
    if let Some(programmers) = args.programmers {
        lab.programmers = programmers;
    }
    if let Some(rounds) = args.rounds {
        lab.rounds = rounds;
    }

    let report = run_lab(&lab).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
