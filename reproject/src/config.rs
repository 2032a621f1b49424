//! Execution configuration for reprojection requests.
//!
//! The caller chooses parallelism the same way as on the command line: a
//! boolean flag (`true` = all available CPUs, `false` = serial) or an explicit
//! worker count. The value is checked and resolved into an
//! [`ExecutionStrategy`] before any coordinate is computed.
//!
//! ```json
//! { "parallelism": 4, "poll_interval_ms": 10, "thread_name_prefix": "reproject-worker" }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::ReprojectError;

/// Requested degree of parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ParallelismValue", into = "ParallelismValue")]
pub enum Parallelism {
    /// One worker per available CPU, counted at dispatch time
    #[default]
    Auto,
    /// Run on the calling thread
    Serial,
    /// Explicit worker count; must be strictly positive
    Workers(i64),
}

/// JSON shape of [`Parallelism`]: `true`, `false` or an integer
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ParallelismValue {
    Flag(bool),
    Count(i64),
}

impl From<ParallelismValue> for Parallelism {
    fn from(value: ParallelismValue) -> Self {
        match value {
            ParallelismValue::Flag(flag) => flag.into(),
            ParallelismValue::Count(count) => count.into(),
        }
    }
}

impl From<Parallelism> for ParallelismValue {
    fn from(value: Parallelism) -> Self {
        match value {
            Parallelism::Auto => ParallelismValue::Flag(true),
            Parallelism::Serial => ParallelismValue::Flag(false),
            Parallelism::Workers(n) => ParallelismValue::Count(n),
        }
    }
}

impl From<bool> for Parallelism {
    fn from(enabled: bool) -> Self {
        if enabled {
            Parallelism::Auto
        } else {
            Parallelism::Serial
        }
    }
}

impl From<i64> for Parallelism {
    fn from(workers: i64) -> Self {
        Parallelism::Workers(workers)
    }
}

impl From<i32> for Parallelism {
    fn from(workers: i32) -> Self {
        Parallelism::Workers(workers.into())
    }
}

impl From<usize> for Parallelism {
    fn from(workers: usize) -> Self {
        Parallelism::Workers(i64::try_from(workers).unwrap_or(i64::MAX))
    }
}

/// Number of workers in a parallel run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCount {
    /// All logical CPUs, determined when the pool is built
    Available,
    Fixed(usize),
}

impl WorkerCount {
    /// Concrete worker count
    pub fn resolve(self) -> usize {
        match self {
            WorkerCount::Available => num_cpus::get().max(1),
            WorkerCount::Fixed(n) => n,
        }
    }
}

/// How a request is executed once the corner mapping is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Serial,
    Parallel { workers: WorkerCount },
}

impl Parallelism {
    /// Validate and resolve into an execution strategy.
    ///
    /// # Errors
    /// * `ReprojectError::InvalidConcurrency` - For zero or negative worker counts
    pub fn resolve(self) -> Result<ExecutionStrategy, ReprojectError> {
        match self {
            Parallelism::Auto => Ok(ExecutionStrategy::Parallel {
                workers: WorkerCount::Available,
            }),
            Parallelism::Serial => Ok(ExecutionStrategy::Serial),
            Parallelism::Workers(n) if n <= 0 => Err(ReprojectError::InvalidConcurrency(n)),
            Parallelism::Workers(1) => Ok(ExecutionStrategy::Serial),
            Parallelism::Workers(n) => Ok(ExecutionStrategy::Parallel {
                workers: WorkerCount::Fixed(usize::try_from(n).unwrap_or(usize::MAX)),
            }),
        }
    }
}

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for a [`crate::Reprojector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectConfig {
    /// Serial, all CPUs, or an explicit worker count
    pub parallelism: Parallelism,

    /// How often the orchestrator checks for cancellation while waiting on workers
    pub poll_interval_ms: u64,

    /// Prefix for worker thread names
    pub thread_name_prefix: String,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::Auto,
            poll_interval_ms: 10,
            thread_name_prefix: "reproject-worker".to_string(),
        }
    }
}

impl ReprojectConfig {
    /// Default configuration with the given parallelism
    pub fn with_parallelism(parallelism: impl Into<Parallelism>) -> Self {
        Self {
            parallelism: parallelism.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON text; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the configuration and resolve the execution strategy.
    ///
    /// Called before any work begins, so configuration errors are raised
    /// without touching the projections.
    pub fn validate(&self) -> Result<ExecutionStrategy, ReprojectError> {
        if self.poll_interval_ms == 0 {
            return Err(ReprojectError::InvalidConfig(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        self.parallelism.resolve()
    }
}
