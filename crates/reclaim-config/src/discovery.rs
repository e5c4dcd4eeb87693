//! Locating and layering config files.
//!
//! Two layers are read, lowest precedence first:
//! 1. the user file, `config.toml` in `RECLAIM_CONFIG_DIR` or the platform
//!    config directory (`~/.config/reclaim` on Linux)
//! 2. the project file, `reclaim.toml` in the working directory
//!
//! CLI flags override both and are applied by the binary. A layer that fails
//! to read or parse is kept as [`LayerStatus::Rejected`] and skipped, so one
//! bad file never stops a sweep from starting.

use std::fmt;
use std::path::{Path, PathBuf};

use reclaim_sweep::SweepStrategy;

use crate::{ConfigError, ReclaimConfig, Result};

/// Project-local config filename.
pub const PROJECT_CONFIG_FILE: &str = "reclaim.toml";

/// Config filename inside the user config directory.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Overrides the user config directory.
pub const CONFIG_DIR_ENV: &str = "RECLAIM_CONFIG_DIR";

/// Which layer a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    User,
    Project,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::User => f.write_str("user"),
            LayerKind::Project => f.write_str("project"),
        }
    }
}

/// What happened when a layer was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    /// No file at the path.
    Missing,
    /// Merged. `strategy` is the `[sweep] strategy` the file set, if any.
    Applied { strategy: Option<SweepStrategy> },
    /// Present but unusable; the message says why.
    Rejected(String),
}

/// One config file considered during discovery.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub kind: LayerKind,
    pub path: PathBuf,
    pub status: LayerStatus,
}

impl ConfigLayer {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, LayerStatus::Applied { .. })
    }

    /// Strategy this layer contributed.
    pub fn strategy(&self) -> Option<SweepStrategy> {
        match self.status {
            LayerStatus::Applied { strategy } => strategy,
            _ => None,
        }
    }
}

/// Merged config plus the layers it was built from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ReclaimConfig,
    /// Lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

impl ResolvedConfig {
    /// Paths of the layers that were merged.
    pub fn applied_paths(&self) -> Vec<&Path> {
        self.layers
            .iter()
            .filter(|l| l.is_applied())
            .map(|l| l.path.as_path())
            .collect()
    }

    /// One message per rejected layer.
    pub fn warnings(&self) -> Vec<String> {
        self.layers
            .iter()
            .filter_map(|l| match &l.status {
                LayerStatus::Rejected(reason) => {
                    Some(format!("ignoring {} config {}: {}", l.kind, l.path.display(), reason))
                }
                _ => None,
            })
            .collect()
    }

    /// The layer whose `[sweep] strategy` won, or `None` if the default applies.
    pub fn strategy_origin(&self) -> Option<&ConfigLayer> {
        self.layers.iter().rev().find(|l| l.strategy().is_some())
    }
}

/// Discover config for a run in `project_dir` (the working directory if `None`).
pub fn discover(project_dir: Option<&Path>) -> ResolvedConfig {
    discover_in(project_dir, user_config_dir().as_deref())
}

/// Discover config with an explicit user config directory.
///
/// `user_dir = None` skips the user layer entirely.
pub fn discover_in(project_dir: Option<&Path>, user_dir: Option<&Path>) -> ResolvedConfig {
    let mut config = ReclaimConfig::new();
    let mut layers = Vec::with_capacity(2);

    if let Some(dir) = user_dir {
        layers.push(apply_layer(&mut config, LayerKind::User, dir.join(USER_CONFIG_FILE)));
    }

    let project_file = match project_dir {
        Some(dir) => dir.join(PROJECT_CONFIG_FILE),
        None => PathBuf::from(PROJECT_CONFIG_FILE),
    };
    layers.push(apply_layer(&mut config, LayerKind::Project, project_file));

    ResolvedConfig { config, layers }
}

/// Read and parse one config file.
pub fn read_config_file(path: &Path) -> Result<ReclaimConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    ReclaimConfig::from_toml(&contents)
}

/// User config directory: `RECLAIM_CONFIG_DIR` if set, else the platform one.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("reclaim")),
    }
}

/// Full path of the user config file.
pub fn user_config_file() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

fn apply_layer(config: &mut ReclaimConfig, kind: LayerKind, path: PathBuf) -> ConfigLayer {
    let status = if !path.is_file() {
        LayerStatus::Missing
    } else {
        match read_config_file(&path) {
            Ok(layer) => {
                let strategy = layer.sweep.as_ref().and_then(|s| s.strategy);
                config.merge(layer);
                LayerStatus::Applied { strategy }
            }
            Err(e) => LayerStatus::Rejected(e.to_string()),
        }
    };
    ConfigLayer { kind, path, status }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
