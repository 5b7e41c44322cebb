//! Lock-free room metrics
//!
//! Counters are plain atomics so the admission controller can record them
//! while it holds its own lock without taking a second one.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only; room decisions never read them.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries for queue wait (milliseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a wait value using binary search
#[inline]
fn bucket_index(wait_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < wait_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector for one room
pub struct Metrics {
    /// Every call to arrive
    arrivals_total: AtomicU64,
    /// Arrivals admitted without waiting
    admitted_direct_total: AtomicU64,
    /// Arrivals rejected by the sign
    queued_total: AtomicU64,
    /// Queue entries admitted by a drain step
    drained_total: AtomicU64,
    /// Completed departures
    departures_total: AtomicU64,
    /// Times the sign went from a species back to EMPTY
    sign_flips_total: AtomicU64,
    /// Highest occupant count seen
    peak_occupancy: AtomicU64,
    /// Longest wait queue seen
    peak_queue_depth: AtomicU64,
    /// Time from rejection to drain (ms) histogram
    queue_wait_buckets: [AtomicU64; NUM_BUCKETS],
    queue_wait_sum_ms: AtomicU64,
    queue_wait_max_ms: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            arrivals_total: AtomicU64::new(0),
            admitted_direct_total: AtomicU64::new(0),
            queued_total: AtomicU64::new(0),
            drained_total: AtomicU64::new(0),
            departures_total: AtomicU64::new(0),
            sign_flips_total: AtomicU64::new(0),
            peak_occupancy: AtomicU64::new(0),
            peak_queue_depth: AtomicU64::new(0),
            queue_wait_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            queue_wait_sum_ms: AtomicU64::new(0),
            queue_wait_max_ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record an admission on arrival along with the resulting occupancy
    #[inline]
    pub fn record_admitted(&self, occupancy: u32) {
        self.arrivals_total.fetch_add(1, Ordering::Relaxed);
        self.admitted_direct_total.fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.peak_occupancy, u64::from(occupancy));
    }

    /// Record a rejection along with the resulting queue depth
    #[inline]
    pub fn record_queued(&self, queue_depth: usize) {
        self.arrivals_total.fetch_add(1, Ordering::Relaxed);
        self.queued_total.fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.peak_queue_depth, queue_depth as u64);
    }

    /// Record a drain step and how long the drained animal waited
    #[inline]
    pub fn record_drained(&self, wait_ms: u64) {
        self.drained_total.fetch_add(1, Ordering::Relaxed);
        self.queue_wait_buckets[bucket_index(wait_ms)].fetch_add(1, Ordering::Relaxed);
        self.queue_wait_sum_ms.fetch_add(wait_ms, Ordering::Relaxed);
        update_atomic_max(&self.queue_wait_max_ms, wait_ms);
        update_atomic_max(&self.peak_occupancy, 1);
    }

    #[inline]
    pub fn record_departure(&self, emptied: bool) {
        self.departures_total.fetch_add(1, Ordering::Relaxed);
        if emptied {
            self.sign_flips_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn arrivals_total(&self) -> u64 {
        self.arrivals_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queued_total(&self) -> u64 {
        self.queued_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn drained_total(&self) -> u64 {
        self.drained_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn departures_total(&self) -> u64 {
        self.departures_total.load(Ordering::Relaxed)
    }

    /// Take a consistent-enough snapshot of all counters
    pub fn report(&self) -> MetricsSummary {
        let queue_wait_buckets = load_buckets(&self.queue_wait_buckets);
        let drained_total = self.drained_total.load(Ordering::Relaxed);
        let queue_wait_sum_ms = self.queue_wait_sum_ms.load(Ordering::Relaxed);

        MetricsSummary {
            arrivals_total: self.arrivals_total.load(Ordering::Relaxed),
            admitted_direct_total: self.admitted_direct_total.load(Ordering::Relaxed),
            queued_total: self.queued_total.load(Ordering::Relaxed),
            drained_total,
            departures_total: self.departures_total.load(Ordering::Relaxed),
            sign_flips_total: self.sign_flips_total.load(Ordering::Relaxed),
            peak_occupancy: self.peak_occupancy.load(Ordering::Relaxed),
            peak_queue_depth: self.peak_queue_depth.load(Ordering::Relaxed),
            queue_wait_avg_ms: if drained_total > 0 { queue_wait_sum_ms / drained_total } else { 0 },
            queue_wait_max_ms: self.queue_wait_max_ms.load(Ordering::Relaxed),
            queue_wait_p95_ms: percentile_from_buckets(&queue_wait_buckets, 0.95),
            queue_wait_buckets,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub arrivals_total: u64,
    pub admitted_direct_total: u64,
    pub queued_total: u64,
    pub drained_total: u64,
    pub departures_total: u64,
    pub sign_flips_total: u64,
    pub peak_occupancy: u64,
    pub peak_queue_depth: u64,
    pub queue_wait_avg_ms: u64,
    pub queue_wait_max_ms: u64,
    pub queue_wait_p95_ms: u64,
    /// Bounds: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120 ms
    pub queue_wait_buckets: [u64; NUM_BUCKETS],
    pub elapsed_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            arrivals = %self.arrivals_total,
            admitted = %self.admitted_direct_total,
            queued = %self.queued_total,
            drained = %self.drained_total,
            departures = %self.departures_total,
            sign_flips = %self.sign_flips_total,
            peak_occupancy = %self.peak_occupancy,
            peak_queue_depth = %self.peak_queue_depth,
            queue_wait_avg_ms = %self.queue_wait_avg_ms,
            queue_wait_p95_ms = %self.queue_wait_p95_ms,
            elapsed_ms = %self.elapsed_ms,
            "metrics"
        );
    }
}
