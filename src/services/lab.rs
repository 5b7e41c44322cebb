//! Programmer lab: one exclusive compiler, one shared database
//!
//! Each programmer repeatedly takes the compiler, then a database slot,
//! compiles, releases both and rests. The compiler is always taken first,
//! so the two permits are acquired in a fixed order.

use crate::infra::config::LabConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

/// Holder counts for one resource, with the high-water mark
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabReport {
    pub programmers: usize,
    pub compilations: u64,
    pub peak_compiler_holders: usize,
    pub peak_database_holders: usize,
    pub db_slots: usize,
}

struct Lab {
    compiler: Semaphore,
    database: Semaphore,
    compiler_gauge: Gauge,
    database_gauge: Gauge,
    compilations: AtomicU64,
}

/// Run the lab for the configured number of rounds per programmer
pub async fn run_lab(config: &LabConfig) -> anyhow::Result<LabReport> {
    let lab = Arc::new(Lab {
        compiler: Semaphore::new(1),
        database: Semaphore::new(config.db_slots),
        compiler_gauge: Gauge::default(),
        database_gauge: Gauge::default(),
        compilations: AtomicU64::new(0),
    });
    info!(
        programmers = config.programmers,
        rounds = config.rounds,
        db_slots = config.db_slots,
        "lab_started"
    );

    let mut tasks = JoinSet::new();
    for id in 1..=config.programmers {
        let lab = lab.clone();
        let rounds = config.rounds;
        let compile = Duration::from_millis(config.compile_ms);
        let rest = Duration::from_millis(config.rest_ms);
        tasks.spawn(async move { programmer(lab, id, rounds, compile, rest).await });
    }
    while let Some(result) = tasks.join_next().await {
        result??;
    }

    let report = LabReport {
        programmers: config.programmers,
        compilations: lab.compilations.load(Ordering::SeqCst),
        peak_compiler_holders: lab.compiler_gauge.peak(),
        peak_database_holders: lab.database_gauge.peak(),
        db_slots: config.db_slots,
    };
    info!(
        compilations = report.compilations,
        peak_compiler_holders = report.peak_compiler_holders,
        peak_database_holders = report.peak_database_holders,
        "lab_finished"
    );
    Ok(report)
}

async fn programmer(
    lab: Arc<Lab>,
    id: usize,
    rounds: usize,
    compile: Duration,
    rest: Duration,
) -> anyhow::Result<()> {
    for round in 1..=rounds {
        info!(programmer = id, round, "waiting_for_compiler");
        let compiler = lab.compiler.acquire().await?;
        lab.compiler_gauge.enter();
        info!(programmer = id, "compiler_acquired");

        let database = lab.database.acquire().await?;
        lab.database_gauge.enter();
        info!(programmer = id, "database_acquired");

        tokio::time::sleep(compile).await;
        lab.compilations.fetch_add(1, Ordering::SeqCst);

        lab.database_gauge.leave();
        drop(database);
        lab.compiler_gauge.leave();
        drop(compiler);
        info!(programmer = id, round, "compilation_finished");

        tokio::time::sleep(rest).await;
    }
    Ok(())
}
