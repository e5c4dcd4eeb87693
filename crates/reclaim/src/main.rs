//! Reclaim - parallel expiry sweeps for in-memory session stores
//!
//! Main entry point for the Reclaim CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{config, sweep};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Reclaim - parallel expiry sweeps for in-memory session stores
#[derive(Parser)]
#[command(name = "reclaim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a simulated session store and run expiry sweeps over it
    Sweep(sweep::SweepArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = reclaim_config::discover(None);

    let log_dir = resolved
        .config
        .logging
        .as_ref()
        .and_then(|l| l.directory.clone())
        .or_else(|| reclaim_config::user_config_dir().map(|d| d.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _guard = init_tracing(cli.verbose, &log_dir);

    for warning in resolved.warnings() {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config: resolved,
    };

    match cli.command {
        Commands::Sweep(args) => sweep::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console (human-readable) + rotating JSON file.
///
/// Falls back to console only when the log directory cannot be created.
fn init_tracing(verbose: bool, log_dir: &std::path::Path) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "reclaim=debug,reclaim_sweep=debug,reclaim_session=debug,reclaim_config=debug,info"
    } else {
        "reclaim=info,reclaim_sweep=info,reclaim_session=info,warn"
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    let appender = std::fs::create_dir_all(log_dir).ok().and_then(|_| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("reclaim")
            .filename_suffix("log")
            .build(log_dir)
            .ok()
    });

    match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_filter(tracing_subscriber::EnvFilter::new(
                            "reclaim=trace,reclaim_sweep=trace,reclaim_session=trace,reclaim_config=trace,info",
                        )),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            None
        }
    }
}
