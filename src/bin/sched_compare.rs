//! Scheduling comparison - FCFS vs SJF vs Round Robin
//!
//! Usage:
//!   cargo run --bin sched-compare -- --workload config/processes.json

use clap::Parser;
use tracing::info;
use vet_room::infra::{logging, Config};
use vet_room::services::scheduling::{SchedulingWorkload, EXTRA_RR_QUANTUM};

#[derive(Parser, Debug)]
#[command(name = "sched-compare", version, about = "Compare CPU scheduling algorithms")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Process workload JSON (overrides the config file)
    #[arg(short, long)]
    workload: Option<String>,

    /// Extra Round Robin quantum to evaluate (repeatable)
    #[arg(long, default_values_t = [EXTRA_RR_QUANTUM])]
    quantum: Vec<u64>,

    /// Print results as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);
    logging::init(&config);

    let path = args.workload.as_deref().unwrap_or(config.scheduling_file());
    let mut workload = SchedulingWorkload::from_file(path)?;
    for quantum in args.quantum {
        workload = workload.with_quantum(quantum)?;
    }

    info!(
        workload = %path,
        processes = workload.workload.processes.len(),
        context_switch_cost = workload.metadata.context_switch_cost,
        throughput_window = workload.metadata.throughput_window,
        "scheduling_compare_started"
    );

    let results = workload.compare();
    for result in &results {
        info!(
            algorithm = %result.algorithm,
            avg_wait = format!("{:.2}", result.avg_wait),
            avg_turnaround = format!("{:.2}", result.avg_turnaround),
            throughput = format!("{:.4}", result.throughput),
            "scheduling_result"
        );
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
