//! Per-pass sweep statistics.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// How a sweep pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Every handle in the view was visited.
    Completed,
    /// The view was empty; nothing was checked.
    Empty,
    /// A cancellation signal stopped dispatch before the view was exhausted.
    Cancelled,
    /// The soft timeout stopped dispatch before the view was exhausted.
    TimedOut,
    /// Another pass was already running; this one did nothing.
    Overlapped,
    /// A worker died outside per-handle isolation. The handles it visited
    /// are missing from the counts and reported as skipped.
    Aborted,
}

/// Aggregate result of one sweep pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    /// Handles whose validity was evaluated.
    pub scanned: usize,

    /// Handles released by this pass.
    pub purged: usize,

    /// Invalid handles some other thread had already released.
    pub already_released: usize,

    /// Handles whose check or release faulted. Left for the next pass.
    pub failed: usize,

    /// Handles in the view that were never visited.
    pub skipped: usize,

    /// Wall-clock time of this pass.
    #[serde(rename = "elapsed_ms", serialize_with = "duration_ms")]
    pub elapsed: Duration,

    /// Sum of all pass durations for the engine's lifetime, this one included.
    #[serde(rename = "cumulative_ms", serialize_with = "duration_ms")]
    pub cumulative: Duration,

    /// How the pass ended.
    pub outcome: SweepOutcome,
}

impl SweepResult {
    /// Result for a pass over an empty view.
    pub fn empty(cumulative: Duration) -> Self {
        Self::idle(SweepOutcome::Empty, cumulative)
    }

    /// Result for a trigger that found another pass in progress.
    pub fn overlapped(cumulative: Duration) -> Self {
        Self::idle(SweepOutcome::Overlapped, cumulative)
    }

    fn idle(outcome: SweepOutcome, cumulative: Duration) -> Self {
        Self {
            scanned: 0,
            purged: 0,
            already_released: 0,
            failed: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
            cumulative,
            outcome,
        }
    }

    /// Whether every handle in the view was visited.
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, SweepOutcome::Completed | SweepOutcome::Empty)
    }
}

fn duration_ms<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
