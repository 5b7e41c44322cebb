//! CPU scheduling comparators: FCFS, SJF and Round Robin
//!
//! Deterministic, single-threaded evaluation over a static process list.
//! Every algorithm charges `context_switch_cost` after each dispatch.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Round Robin quantum always evaluated on top of the workload's own list
pub const EXTRA_RR_QUANTUM: u64 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Process {
    #[serde(default)]
    pub id: String,
    pub arrival_time: u64,
    pub burst_time: u64,
}

impl Process {
    pub fn new(id: impl Into<String>, arrival_time: u64, burst_time: u64) -> Self {
        Self { id: id.into(), arrival_time, burst_time }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingMetadata {
    #[serde(default)]
    pub context_switch_cost: u64,
    #[serde(rename = "throughput_window_T")]
    pub throughput_window: u64,
    #[serde(default)]
    pub rr_quantums: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSection {
    pub processes: Vec<Process>,
}

/// Scheduling workload file
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingWorkload {
    pub metadata: SchedulingMetadata,
    pub workload: ProcessSection,
}

impl SchedulingWorkload {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scheduling workload {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid scheduling workload {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let workload: SchedulingWorkload =
            serde_json::from_str(content).context("Failed to parse scheduling JSON")?;
        ensure!(!workload.workload.processes.is_empty(), "workload has no processes");
        ensure!(workload.metadata.throughput_window > 0, "throughput_window_T must be > 0");
        ensure!(
            workload.metadata.rr_quantums.iter().all(|&q| q > 0),
            "rr_quantums must be > 0"
        );
        Ok(workload)
    }

    /// Add a Round Robin quantum unless the workload already lists it
    pub fn with_quantum(mut self, quantum: u64) -> anyhow::Result<Self> {
        ensure!(quantum > 0, "quantum must be > 0");
        if !self.metadata.rr_quantums.contains(&quantum) {
            self.metadata.rr_quantums.push(quantum);
        }
        Ok(self)
    }

    /// Run FCFS, SJF and every configured RR quantum
    pub fn compare(&self) -> Vec<AlgorithmResult> {
        let processes = &self.workload.processes;
        let cost = self.metadata.context_switch_cost;
        let window = self.metadata.throughput_window;

        let mut results = vec![
            AlgorithmResult::new("FCFS", fcfs(processes, cost), window),
            AlgorithmResult::new("SJF", sjf(processes, cost), window),
        ];
        for &quantum in &self.metadata.rr_quantums {
            results.push(AlgorithmResult::new(
                format!("RR-{quantum}"),
                round_robin(processes, quantum, cost),
                window,
            ));
        }
        results
    }
}

/// Per-process timing produced by one algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// (wait, turnaround) per completed process
    pub completions: Vec<(u64, u64)>,
    /// Clock value when the last dispatch (plus switch cost) ended
    pub makespan: u64,
}

impl Schedule {
    fn complete(&mut self, process: &Process, finish: u64) {
        let turnaround = finish - process.arrival_time;
        let wait = turnaround.saturating_sub(process.burst_time);
        debug!(process = %process.id, wait, turnaround, "process_completed");
        self.completions.push((wait, turnaround));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmResult {
    pub algorithm: String,
    pub avg_wait: f64,
    pub avg_turnaround: f64,
    /// Completed processes per throughput window
    pub throughput: f64,
}

impl AlgorithmResult {
    pub fn new(algorithm: impl Into<String>, schedule: Schedule, window: u64) -> Self {
        let n = schedule.completions.len() as f64;
        let (wait_sum, turnaround_sum) = schedule
            .completions
            .iter()
            .fold((0u64, 0u64), |(w, t), &(wait, turnaround)| (w + wait, t + turnaround));
        let avg = |sum: u64| if n > 0.0 { sum as f64 / n } else { 0.0 };
        let throughput = if schedule.makespan > 0 {
            n * window as f64 / schedule.makespan as f64
        } else {
            0.0
        };
        Self {
            algorithm: algorithm.into(),
            avg_wait: avg(wait_sum),
            avg_turnaround: avg(turnaround_sum),
            throughput,
        }
    }
}

fn by_arrival(processes: &[Process]) -> Vec<Process> {
    let mut sorted = processes.to_vec();
    // Stable sort keeps file order for equal arrivals
    sorted.sort_by_key(|p| p.arrival_time);
    sorted
}

/// First come, first served
pub fn fcfs(processes: &[Process], context_switch_cost: u64) -> Schedule {
    let mut schedule = Schedule::default();
    let mut clock = 0;
    for process in by_arrival(processes) {
        clock = clock.max(process.arrival_time);
        clock += process.burst_time;
        schedule.complete(&process, clock);
        clock += context_switch_cost;
    }
    schedule.makespan = clock;
    schedule
}

/// Non-preemptive shortest job first
pub fn sjf(processes: &[Process], context_switch_cost: u64) -> Schedule {
    let pending = by_arrival(processes);
    let mut schedule = Schedule::default();
    let mut ready: Vec<Process> = Vec::new();
    let mut next = 0;
    let mut clock = 0;

    while next < pending.len() || !ready.is_empty() {
        while next < pending.len() && pending[next].arrival_time <= clock {
            ready.push(pending[next].clone());
            next += 1;
        }
        if ready.is_empty() {
            clock = pending[next].arrival_time;
            continue;
        }
        // min_by_key returns the first minimum, so ties go to the earlier arrival
        let Some(shortest) = (0..ready.len()).min_by_key(|&i| ready[i].burst_time) else {
            continue;
        };
        let process = ready.remove(shortest);
        clock += process.burst_time;
        schedule.complete(&process, clock);
        clock += context_switch_cost;
    }
    schedule.makespan = clock;
    schedule
}

/// Round Robin with a fixed quantum
pub fn round_robin(processes: &[Process], quantum: u64, context_switch_cost: u64) -> Schedule {
    let max_burst = processes.iter().map(|p| p.burst_time).max().unwrap_or(0);
    if quantum >= max_burst {
        return fcfs(processes, context_switch_cost);
    }

    let pending = by_arrival(processes);
    let mut remaining: Vec<u64> = pending.iter().map(|p| p.burst_time).collect();
    let mut schedule = Schedule::default();
    let mut ready: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    let mut clock = 0;

    while next < pending.len() || !ready.is_empty() {
        while next < pending.len() && pending[next].arrival_time <= clock {
            ready.push_back(next);
            next += 1;
        }
        let Some(idx) = ready.pop_front() else {
            clock = pending[next].arrival_time;
            continue;
        };

        let slice = quantum.min(remaining[idx]);
        clock += slice;
        remaining[idx] -= slice;

        if remaining[idx] == 0 {
            schedule.complete(&pending[idx], clock);
        } else {
            // Arrivals during the slice queue ahead of the preempted process
            while next < pending.len() && pending[next].arrival_time <= clock {
                ready.push_back(next);
                next += 1;
            }
            ready.push_back(idx);
        }
        clock += context_switch_cost;
    }
    schedule.makespan = clock;
    schedule
}
