//! CLI command handlers.

pub mod config;
pub mod sweep;

use reclaim_config::ResolvedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration and where it came from.
    pub config: ResolvedConfig,
}
