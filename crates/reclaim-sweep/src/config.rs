//! Configuration for the sweep engine.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of handles per work unit.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// How a pass spreads its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStrategy {
    /// One worker on the calling thread.
    #[serde(alias = "serial")]
    Sequential,
    /// A bounded pool of scoped worker threads.
    #[default]
    #[serde(alias = "concurrent")]
    Parallel,
}

impl fmt::Display for SweepStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepStrategy::Sequential => f.write_str("sequential"),
            SweepStrategy::Parallel => f.write_str("parallel"),
        }
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sweep strategy '{0}' (expected 'sequential' or 'parallel')")]
pub struct ParseStrategyError(String);

impl FromStr for SweepStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "serial" => Ok(SweepStrategy::Sequential),
            "parallel" | "concurrent" => Ok(SweepStrategy::Parallel),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

/// Configuration for the sweep engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Sequential or parallel execution.
    pub strategy: SweepStrategy,

    /// Upper bound on worker threads for the parallel strategy.
    /// `None` uses the available hardware parallelism.
    pub workers: Option<usize>,

    /// Handles per work unit. Cancellation and the soft timeout are only
    /// checked between units.
    pub batch_size: usize,

    /// Soft timeout: once exceeded, no new work units are started.
    pub timeout: Option<Duration>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            strategy: SweepStrategy::default(),
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
        }
    }
}

impl SweepConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-worker configuration.
    pub fn sequential() -> Self {
        Self::default().with_strategy(SweepStrategy::Sequential)
    }

    /// Parallel configuration sized to the hardware.
    pub fn parallel() -> Self {
        Self::default().with_strategy(SweepStrategy::Parallel)
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: SweepStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cap the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the number of handles per work unit.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the soft timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the soft timeout.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Effective batch size (never zero).
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Number of workers a pass may use.
    pub fn worker_count(&self) -> usize {
        match self.strategy {
            SweepStrategy::Sequential => 1,
            SweepStrategy::Parallel => self
                .workers
                .unwrap_or_else(|| {
                    std::thread::available_parallelism()
                        .map(NonZeroUsize::get)
                        .unwrap_or(1)
                })
                .max(1),
        }
    }
}
