//! The sweep engine: one pass over a view of session handles.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use reclaim_session::{Release, SessionHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, trace, warn};

use crate::config::SweepConfig;
use crate::result::{SweepOutcome, SweepResult};

/// Runs sweep passes and keeps cumulative timing across them.
///
/// A pass splits the view into fixed-size batches. Workers claim batches
/// from a shared cursor until the view is exhausted, a cancellation token
/// fires, or the soft timeout elapses; each worker keeps its own tally and
/// the tallies are summed once every worker has joined. The engine holds no
/// lock over the view and never removes handles itself; it only calls
/// [`SessionHandle::expire`].
pub struct SweepEngine {
    config: SweepConfig,
    span: Span,
    cumulative_nanos: AtomicU64,
    passes: AtomicU64,
    shutdown: CancellationToken,
}

impl SweepEngine {
    /// Create an engine. Every pass runs inside `span`.
    pub fn new(config: SweepConfig, span: Span) -> Self {
        Self {
            config,
            span,
            cumulative_nanos: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Total time spent in passes so far.
    pub fn cumulative(&self) -> Duration {
        Duration::from_nanos(self.cumulative_nanos.load(Ordering::Acquire))
    }

    /// Number of non-empty passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    /// Stop the current pass and every later one from dispatching work.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one pass to completion.
    pub fn run<H: SessionHandle>(&self, view: &[H]) -> SweepResult {
        self.run_with_cancel(view, &CancellationToken::new())
    }

    /// Run one pass, stopping dispatch early if `cancel` fires.
    pub fn run_with_cancel<H: SessionHandle>(
        &self,
        view: &[H],
        cancel: &CancellationToken,
    ) -> SweepResult {
        let _enter = self.span.enter();

        if view.is_empty() {
            debug!("View is empty, nothing to sweep");
            return SweepResult::empty(self.cumulative());
        }

        let started = Instant::now();
        let stop = Stop {
            cancel,
            shutdown: &self.shutdown,
            deadline: self.config.timeout.map(|t| started + t),
        };
        let batch_size = self.config.effective_batch_size();
        let batches = view.len().div_ceil(batch_size);
        let workers = self.config.worker_count().min(batches);
        let cursor = AtomicUsize::new(0);

        trace!(handles = view.len(), batches, workers, "Dispatching sweep");

        let tally = if workers <= 1 {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                drain(view, batch_size, &cursor, &stop)
            }));
            collect(Tally::default(), outcome)
        } else {
            let span = &self.span;
            let cursor = &cursor;
            let stop = &stop;
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| {
                        scope.spawn(move || {
                            let _enter = span.enter();
                            drain(view, batch_size, cursor, stop)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .fold(Tally::default(), |acc, handle| collect(acc, handle.join()))
            })
        };

        let nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let cumulative = self
            .cumulative_nanos
            .fetch_add(nanos, Ordering::AcqRel)
            .saturating_add(nanos);
        self.passes.fetch_add(1, Ordering::AcqRel);

        let outcome = if tally.lost_workers > 0 {
            SweepOutcome::Aborted
        } else if tally.scanned == view.len() {
            SweepOutcome::Completed
        } else {
            match tally.halted {
                Some(Halt::TimedOut) => SweepOutcome::TimedOut,
                _ => SweepOutcome::Cancelled,
            }
        };

        SweepResult {
            scanned: tally.scanned,
            purged: tally.purged,
            already_released: tally.already_released,
            failed: tally.failed,
            skipped: view.len() - tally.scanned,
            elapsed: Duration::from_nanos(nanos),
            cumulative: Duration::from_nanos(cumulative),
            outcome,
        }
    }
}

impl std::fmt::Debug for SweepEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepEngine")
            .field("config", &self.config)
            .field("passes", &self.passes())
            .field("cumulative", &self.cumulative())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Cancelled,
    TimedOut,
}

/// Conditions checked between batches.
struct Stop<'a> {
    cancel: &'a CancellationToken,
    shutdown: &'a CancellationToken,
    deadline: Option<Instant>,
}

impl Stop<'_> {
    fn check(&self) -> Option<Halt> {
        if self.cancel.is_cancelled() || self.shutdown.is_cancelled() {
            return Some(Halt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Halt::TimedOut),
            _ => None,
        }
    }
}

enum Verdict {
    Live,
    Purged,
    AlreadyReleased,
    Failed,
}

#[derive(Debug, Default)]
struct Tally {
    scanned: usize,
    purged: usize,
    already_released: usize,
    failed: usize,
    halted: Option<Halt>,
    lost_workers: usize,
}

impl Tally {
    fn record(&mut self, verdict: Verdict) {
        self.scanned += 1;
        match verdict {
            Verdict::Live => {}
            Verdict::Purged => self.purged += 1,
            Verdict::AlreadyReleased => self.already_released += 1,
            Verdict::Failed => self.failed += 1,
        }
    }

    fn merge(self, other: Tally) -> Tally {
        Tally {
            scanned: self.scanned + other.scanned,
            purged: self.purged + other.purged,
            already_released: self.already_released + other.already_released,
            failed: self.failed + other.failed,
            halted: self.halted.or(other.halted),
            lost_workers: self.lost_workers + other.lost_workers,
        }
    }
}

/// Fold one worker's result into `acc`. A worker that died loses its tally.
fn collect(mut acc: Tally, joined: thread::Result<Tally>) -> Tally {
    match joined {
        Ok(tally) => acc.merge(tally),
        Err(payload) => {
            warn!(
                panic = %panic_message(payload.as_ref()),
                "Sweep worker died outside handle isolation, aborting pass and dropping its tally"
            );
            acc.lost_workers += 1;
            acc
        }
    }
}

/// Claim batches until the view is exhausted or a stop condition holds.
fn drain<H: SessionHandle>(
    view: &[H],
    batch_size: usize,
    cursor: &AtomicUsize,
    stop: &Stop<'_>,
) -> Tally {
    let mut tally = Tally::default();

    loop {
        if let Some(halt) = stop.check() {
            tally.halted = Some(halt);
            break;
        }

        let start = cursor.fetch_add(1, Ordering::Relaxed).saturating_mul(batch_size);
        if start >= view.len() {
            break;
        }
        let end = start.saturating_add(batch_size).min(view.len());

        for handle in &view[start..end] {
            tally.record(sweep_one(handle));
        }
    }

    tally
}

/// Check one handle and release it if invalid. Faults stay contained here.
fn sweep_one<H: SessionHandle>(handle: &H) -> Verdict {
    let outcome = panic::catch_unwind(AssertUnwindSafe(
        || -> reclaim_session::Result<Verdict> {
            if handle.is_valid()? {
                return Ok(Verdict::Live);
            }
            Ok(match handle.expire()? {
                Release::Released => Verdict::Purged,
                Release::AlreadyReleased => Verdict::AlreadyReleased,
            })
        },
    ));

    match outcome {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            warn!(session_id = %handle.id(), error = %e, "Failed to sweep session, leaving it for the next pass");
            Verdict::Failed
        }
        Err(payload) => {
            warn!(
                session_id = %handle.id(),
                panic = %panic_message(payload.as_ref()),
                "Session check panicked, leaving it for the next pass"
            );
            Verdict::Failed
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
