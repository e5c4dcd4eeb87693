//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [sweep]      # expiry sweep strategy and pool sizing
//! [store]      # session store defaults
//! [logging]    # log file placement
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reclaim_sweep::{DEFAULT_BATCH_SIZE, SweepConfig, SweepStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimConfig {
    /// Expiry sweep configuration.
    pub sweep: Option<SweepSection>,

    /// Session store configuration.
    pub store: Option<StoreSection>,

    /// Log output configuration.
    pub logging: Option<LoggingSection>,
}

impl ReclaimConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// `[sweep]` merges field by field, so an override file only needs the
    /// keys it changes. Other sections replace wholesale.
    pub fn merge(&mut self, other: ReclaimConfig) {
        if let Some(sweep) = other.sweep {
            match self.sweep.as_mut() {
                Some(base) => base.merge(sweep),
                None => self.sweep = Some(sweep),
            }
        }

        if other.store.is_some() {
            self.store = other.store;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Build the sweep engine configuration, validating values.
    pub fn sweep_config(&self) -> Result<SweepConfig> {
        self.sweep.clone().unwrap_or_default().to_sweep_config()
    }

    /// Store settings with defaults applied.
    pub fn store_settings(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweep Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Expiry sweep configuration.
///
/// The strategy is a deployment-time choice; the running engine never
/// switches between them.
///
/// ```toml
/// [sweep]
/// strategy = "parallel"
/// workers = 8
/// batch_size = 1024
/// timeout_ms = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// `sequential` or `parallel`.
    pub strategy: Option<SweepStrategy>,
    /// Worker pool cap; defaults to available parallelism.
    pub workers: Option<usize>,
    /// Handles per work unit.
    pub batch_size: Option<usize>,
    /// Soft timeout per pass in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl SweepSection {
    fn merge(&mut self, other: SweepSection) {
        self.strategy = other.strategy.or(self.strategy);
        self.workers = other.workers.or(self.workers);
        self.batch_size = other.batch_size.or(self.batch_size);
        self.timeout_ms = other.timeout_ms.or(self.timeout_ms);
    }

    /// Convert to an engine configuration.
    pub fn to_sweep_config(&self) -> Result<SweepConfig> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "sweep.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                field: "sweep.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut config = SweepConfig::new()
            .with_strategy(self.strategy.unwrap_or_default())
            .with_batch_size(self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE));
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default context name.
pub const DEFAULT_STORE_NAME: &str = "ROOT";

/// Default session idle timeout (30 minutes).
pub const DEFAULT_MAX_INACTIVE_SECS: u64 = 1800;

/// Session store configuration.
///
/// ```toml
/// [store]
/// name = "ROOT"
/// max_inactive_secs = 1800
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Context name used in log lines.
    pub name: String,
    /// Idle timeout for new sessions; 0 disables expiry.
    pub max_inactive_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            max_inactive_secs: DEFAULT_MAX_INACTIVE_SECS,
        }
    }
}

impl StoreSection {
    /// Idle timeout as a duration (`None` disables expiry).
    pub fn max_inactive(&self) -> Option<Duration> {
        (self.max_inactive_secs > 0).then(|| Duration::from_secs(self.max_inactive_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Log output configuration.
///
/// ```toml
/// [logging]
/// directory = "/var/log/reclaim"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for the rolling JSON log file. Defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = ReclaimConfig::from_toml(
            r#"
[sweep]
strategy = "sequential"
workers = 4
batch_size = 256
timeout_ms = 750

[store]
name = "shop"
max_inactive_secs = 600

[logging]
directory = "/tmp/reclaim-logs"
"#,
        )
        .unwrap();

        let sweep = config.sweep_config().unwrap();
        assert_eq!(sweep.strategy, SweepStrategy::Sequential);
        assert_eq!(sweep.workers, Some(4));
        assert_eq!(sweep.batch_size, 256);
        assert_eq!(sweep.timeout, Some(Duration::from_millis(750)));

        let store = config.store_settings();
        assert_eq!(store.name, "shop");
        assert_eq!(store.max_inactive(), Some(Duration::from_secs(600)));
        assert_eq!(
            config.logging.unwrap().directory,
            Some(PathBuf::from("/tmp/reclaim-logs"))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ReclaimConfig::from_toml("").unwrap();
        assert_eq!(config.sweep_config().unwrap(), SweepConfig::default());

        let store = config.store_settings();
        assert_eq!(store.name, DEFAULT_STORE_NAME);
        assert_eq!(store.max_inactive_secs, DEFAULT_MAX_INACTIVE_SECS);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = ReclaimConfig::from_toml("[sweep]\nstrategy = \"sideways\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_strategy_aliases_match_cli() {
        for (name, expected) in [
            ("serial", SweepStrategy::Sequential),
            ("concurrent", SweepStrategy::Parallel),
        ] {
            let config = ReclaimConfig::from_toml(&format!("[sweep]\nstrategy = \"{name}\"\n")).unwrap();
            assert_eq!(config.sweep_config().unwrap().strategy, expected);
            assert_eq!(name.parse::<SweepStrategy>(), Ok(expected));
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ReclaimConfig::from_toml("[sweep]\nworkers = 0\n").unwrap();
        assert!(matches!(
            config.sweep_config(),
            Err(ConfigError::Invalid { field, .. }) if field == "sweep.workers"
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = ReclaimConfig::from_toml("[sweep]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            config.sweep_config(),
            Err(ConfigError::Invalid { field, .. }) if field == "sweep.batch_size"
        ));
    }

    #[test]
    fn test_zero_max_inactive_disables_expiry() {
        let store = StoreSection {
            max_inactive_secs: 0,
            ..Default::default()
        };
        assert_eq!(store.max_inactive(), None);
    }

    #[test]
    fn test_merge_sweep_fieldwise() {
        let mut base = ReclaimConfig::from_toml("[sweep]\nstrategy = \"sequential\"\nbatch_size = 64\n").unwrap();
        let overlay = ReclaimConfig::from_toml("[sweep]\nbatch_size = 128\n").unwrap();
        base.merge(overlay);

        let sweep = base.sweep.unwrap();
        assert_eq!(sweep.strategy, Some(SweepStrategy::Sequential));
        assert_eq!(sweep.batch_size, Some(128));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ReclaimConfig {
            sweep: Some(SweepSection {
                strategy: Some(SweepStrategy::Parallel),
                workers: Some(2),
                ..Default::default()
            }),
            store: Some(StoreSection::default()),
            logging: None,
        };

        let toml_str = config.to_toml().unwrap();
        assert_eq!(ReclaimConfig::from_toml(&toml_str).unwrap(), config);
    }
}
