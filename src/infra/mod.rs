//! Infrastructure - configuration, metrics and logging
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free room counters
//! - `logging` - tracing subscriber setup

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, LogFormat};
pub use metrics::{Metrics, MetricsSummary};
