//! Configuration loading from TOML files
//!
//! Each binary takes `--config <path>` (default: config/dev.toml). A missing
//! or invalid file falls back to built-in defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock length of one workload tick
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Room workload (JSON); the built-in demo is used when absent
    #[serde(default)]
    pub workload_file: Option<String>,
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { tick_ms: default_tick_ms(), workload_file: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::Text }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Log the metrics summary when a run finishes
    #[serde(default = "default_report_on_exit")]
    pub report_on_exit: bool,
}

fn default_report_on_exit() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { report_on_exit: default_report_on_exit() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_scheduling_file")]
    pub workload_file: String,
}

fn default_scheduling_file() -> String {
    "config/processes.json".to_string()
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self { workload_file: default_scheduling_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabConfig {
    #[serde(default = "default_programmers")]
    pub programmers: usize,
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_compile_ms")]
    pub compile_ms: u64,
    #[serde(default = "default_rest_ms")]
    pub rest_ms: u64,
    /// Programmers allowed in the database at once
    #[serde(default = "default_db_slots")]
    pub db_slots: usize,
}

fn default_programmers() -> usize {
    5
}

fn default_rounds() -> usize {
    3
}

fn default_compile_ms() -> u64 {
    1000
}

fn default_rest_ms() -> u64 {
    2000
}

fn default_db_slots() -> usize {
    2
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            programmers: default_programmers(),
            rounds: default_rounds(),
            compile_ms: default_compile_ms(),
            rest_ms: default_rest_ms(),
            db_slots: default_db_slots(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub lab: LabConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    tick_ms: u64,
    workload_file: Option<String>,
    log_level: String,
    log_format: LogFormat,
    report_on_exit: bool,
    scheduling_file: String,
    lab: LabConfig,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            tick_ms: toml_config.simulation.tick_ms,
            workload_file: toml_config.simulation.workload_file,
            log_level: toml_config.logging.level,
            log_format: toml_config.logging.format,
            report_on_exit: toml_config.metrics.report_on_exit,
            scheduling_file: toml_config.scheduling.workload_file,
            lab: toml_config.lab,
            config_file,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        anyhow::ensure!(toml_config.simulation.tick_ms > 0, "simulation.tick_ms must be > 0");
        anyhow::ensure!(toml_config.lab.db_slots > 0, "lab.db_slots must be > 0");

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                // Logging may not be initialized yet
                eprintln!("Warning: {:#}. Using defaults.", e);
                warn!(error = %e, "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn workload_file(&self) -> Option<&str> {
        self.workload_file.as_deref()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn report_on_exit(&self) -> bool {
        self.report_on_exit
    }

    pub fn scheduling_file(&self) -> &str {
        &self.scheduling_file
    }

    pub fn lab(&self) -> &LabConfig {
        &self.lab
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to override the tick length
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    /// Builder method to override the workload file
    pub fn with_workload_file(mut self, path: impl Into<String>) -> Self {
        self.workload_file = Some(path.into());
        self
    }
}
