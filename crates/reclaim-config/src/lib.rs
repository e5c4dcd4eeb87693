//! Configuration system for Reclaim.
//!
//! Provides TOML-based configuration with:
//! - Sweep strategy selection and worker pool sizing (`[sweep]`)
//! - Store defaults such as the session idle timeout (`[store]`)
//! - Log file placement (`[logging]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigLayer, LayerKind, LayerStatus, PROJECT_CONFIG_FILE, ResolvedConfig,
    USER_CONFIG_FILE, discover, discover_in, read_config_file, user_config_dir, user_config_file,
};
pub use error::{ConfigError, Result};
pub use types::*;
