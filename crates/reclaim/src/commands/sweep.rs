//! Sweep command - runs expiry passes over a simulated session store.
//!
//! The store is filled through the manager's load hook, with a chosen number
//! of sessions already idle past their timeout. Each pass runs on a blocking
//! thread; Ctrl-C cancels the pass in flight between work units.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use reclaim_session::{MemoryLoader, SessionRecord, SessionStore};
use reclaim_sweep::{ExpiryManager, SessionManager, SweepResult, SweepStrategy};

use super::Context;

/// Number of request threads spawned by `--churn`.
const CHURN_WORKERS: usize = 2;

/// Arguments for the sweep command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Total sessions to load into the store
    #[arg(long, default_value_t = 50_000)]
    pub sessions: usize,

    /// How many of the loaded sessions are already idle past their timeout
    #[arg(long, default_value_t = 40_000)]
    pub expired: usize,

    /// Sweep strategy: sequential or parallel (overrides config)
    #[arg(long)]
    pub strategy: Option<SweepStrategy>,

    /// Worker pool cap (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Sessions per work unit (overrides config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Soft timeout per pass in milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Number of passes to run
    #[arg(long, default_value_t = 1)]
    pub passes: u32,

    /// Create and invalidate sessions from request threads during the passes
    #[arg(long)]
    pub churn: bool,
}

#[derive(Serialize)]
struct PassReport<'a> {
    pass: u32,
    sessions_after: usize,
    #[serde(flatten)]
    result: &'a SweepResult,
}

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    if args.expired > args.sessions {
        bail!(
            "--expired ({}) cannot exceed --sessions ({})",
            args.expired,
            args.sessions
        );
    }

    let mut section = ctx.config.config.sweep.clone().unwrap_or_default();
    if args.strategy.is_some() {
        section.strategy = args.strategy;
    }
    if args.workers.is_some() {
        section.workers = args.workers;
    }
    if args.batch_size.is_some() {
        section.batch_size = args.batch_size;
    }
    if args.timeout_ms.is_some() {
        section.timeout_ms = args.timeout_ms;
    }
    let sweep_config = section.to_sweep_config()?;

    let store_settings = ctx.config.config.store_settings();
    let Some(max_inactive) = store_settings.max_inactive() else {
        bail!("store.max_inactive_secs is 0, so no session can expire");
    };

    let store = Arc::new(SessionStore::new(store_settings.name).with_max_inactive(Some(max_inactive)));
    let manager = Arc::new(SessionManager::new(Arc::clone(&store), sweep_config));

    let loader = MemoryLoader::new(simulated_records(args.sessions, args.expired, max_inactive));
    let restored = manager.load_sessions(&loader)?;
    info!(
        restored,
        expired = args.expired,
        strategy = %manager.engine().config().strategy,
        workers = manager.engine().config().worker_count(),
        "Simulated store loaded"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let churn_stop = CancellationToken::new();
    let churn = if args.churn {
        spawn_churn(&store, &churn_stop)
    } else {
        Vec::new()
    };

    for pass in 1..=args.passes {
        let pass_manager = Arc::clone(&manager);
        let token = cancel.clone();
        let result =
            tokio::task::spawn_blocking(move || pass_manager.process_expires_with_cancel(&token))
                .await?;

        print_pass(ctx, pass, store.len(), &result)?;

        if cancel.is_cancelled() {
            info!(pass, "Sweep interrupted");
            break;
        }
    }

    churn_stop.cancel();
    let mut churned = 0;
    for handle in churn {
        churned += handle.await?;
    }
    debug!(churned, "Churn workers stopped");

    if !ctx.json_output {
        println!();
        println!("Sessions remaining: {}", store.len());
        println!(
            "Cumulative sweep time: {:.3} ms over {} pass(es)",
            manager.engine().cumulative().as_secs_f64() * 1000.0,
            manager.engine().passes()
        );
        if args.churn {
            println!("Sessions churned by request threads: {}", churned);
        }
    }

    Ok(())
}

/// Build `total` records, the first `expired` of which are idle past `max_inactive`.
fn simulated_records(total: usize, expired: usize, max_inactive: Duration) -> Vec<SessionRecord> {
    let now = Utc::now();
    let idle = chrono::Duration::from_std(max_inactive * 2).unwrap_or(chrono::Duration::days(1));

    (0..total)
        .map(|i| {
            let last_accessed = if i < expired { now - idle } else { now };
            SessionRecord::new(format!("sim-{i:08}"))
                .with_created_at(last_accessed)
                .with_last_accessed_at(last_accessed)
                .with_max_inactive(Some(max_inactive))
        })
        .collect()
}

/// Request threads that create sessions and invalidate half of them.
fn spawn_churn(
    store: &Arc<SessionStore>,
    stop: &CancellationToken,
) -> Vec<tokio::task::JoinHandle<usize>> {
    (0..CHURN_WORKERS)
        .map(|_| {
            let store = Arc::clone(store);
            let stop = stop.clone();
            tokio::task::spawn_blocking(move || {
                let mut churned = 0;
                while !stop.is_cancelled() {
                    let session = store.create();
                    session.touch();
                    store.create().invalidate();
                    churned += 2;
                }
                churned
            })
        })
        .collect()
}

fn print_pass(ctx: &Context, pass: u32, sessions_after: usize, result: &SweepResult) -> Result<()> {
    if ctx.json_output {
        let report = PassReport {
            pass,
            sessions_after,
            result,
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!(
        "Pass {}: {:?} - scanned {}, purged {}, already released {}, failed {}, skipped {} in {:.3} ms ({} sessions left)",
        pass,
        result.outcome,
        result.scanned,
        result.purged,
        result.already_released,
        result.failed,
        result.skipped,
        result.elapsed.as_secs_f64() * 1000.0,
        sessions_after
    );
    if ctx.verbose {
        println!(
            "        cumulative {:.3} ms",
            result.cumulative.as_secs_f64() * 1000.0
        );
    }

    Ok(())
}
