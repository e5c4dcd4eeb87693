//! Session manager: a store plus the engine that sweeps it.

use std::sync::Arc;

use parking_lot::Mutex;
use reclaim_session::{SessionHandle, SessionLoader, SessionStore, StandardSession};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, info_span};

use crate::config::SweepConfig;
use crate::engine::SweepEngine;
use crate::result::SweepResult;

/// What a manager needs from a session store.
pub trait SessionSource: Send + Sync {
    /// Handle type yielded by [`snapshot`](Self::snapshot).
    type Handle: SessionHandle;

    /// Context name, for logs.
    fn name(&self) -> &str;

    /// Number of registered sessions.
    fn len(&self) -> usize;

    /// Check if no sessions are registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles registered right now. Each handle appears at most once.
    fn snapshot(&self) -> Vec<Self::Handle>;

    /// Restore persisted sessions.
    fn load(&self, loader: &dyn SessionLoader) -> reclaim_session::Result<usize>;
}

impl SessionSource for SessionStore {
    type Handle = Arc<StandardSession>;

    fn name(&self) -> &str {
        SessionStore::name(self)
    }

    fn len(&self) -> usize {
        SessionStore::len(self)
    }

    fn is_empty(&self) -> bool {
        SessionStore::is_empty(self)
    }

    fn snapshot(&self) -> Vec<Arc<StandardSession>> {
        SessionStore::snapshot(self)
    }

    fn load(&self, loader: &dyn SessionLoader) -> reclaim_session::Result<usize> {
        SessionStore::load(self, loader)
    }
}

/// Entry points a host container calls.
pub trait ExpiryManager: Send + Sync {
    /// Restore sessions at startup. Loader faults propagate unchanged.
    fn load_sessions(&self, loader: &dyn SessionLoader) -> reclaim_session::Result<usize>;

    /// Run one expiry pass over the current sessions.
    fn process_expires(&self) -> SweepResult;
}

/// Sweeps a [`SessionSource`] with a [`SweepEngine`].
///
/// Holds a reference to the store rather than wrapping it, so the store can
/// be shared with request handlers. Passes are serialized: a trigger that
/// arrives while a pass is running returns at once with
/// [`SweepOutcome::Overlapped`](crate::SweepOutcome::Overlapped).
pub struct SessionManager<S: SessionSource = SessionStore> {
    source: Arc<S>,
    engine: SweepEngine,
    span: Span,
    pass_lock: Mutex<()>,
}

impl<S: SessionSource> SessionManager<S> {
    /// Create a manager logging under a span named after the store's context.
    pub fn new(source: Arc<S>, config: SweepConfig) -> Self {
        let span = info_span!(
            "session_manager",
            context = %source.name(),
            strategy = %config.strategy
        );
        Self::with_span(source, config, span)
    }

    /// Create a manager that logs under the given span.
    pub fn with_span(source: Arc<S>, config: SweepConfig, span: Span) -> Self {
        Self {
            engine: SweepEngine::new(config, span.clone()),
            source,
            span,
            pass_lock: Mutex::new(()),
        }
    }

    /// The swept store.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The engine running the passes.
    pub fn engine(&self) -> &SweepEngine {
        &self.engine
    }

    /// Run one expiry pass, stopping dispatch early if `cancel` fires.
    pub fn process_expires_with_cancel(&self, cancel: &CancellationToken) -> SweepResult {
        let _enter = self.span.enter();

        let Some(_pass) = self.pass_lock.try_lock() else {
            debug!("Sweep already in progress, skipping this trigger");
            return SweepResult::overlapped(self.engine.cumulative());
        };

        if self.source.is_empty() {
            debug!("No active session to purge");
            return SweepResult::empty(self.engine.cumulative());
        }

        let view = self.source.snapshot();
        debug!(sessions = view.len(), "Starting to purge expired sessions");

        let result = self.engine.run_with_cancel(&view, cancel);

        debug!(
            purged = result.purged,
            failed = result.failed,
            skipped = result.skipped,
            elapsed_ms = result.elapsed.as_millis() as u64,
            cumulative_ms = result.cumulative.as_millis() as u64,
            outcome = ?result.outcome,
            "Expired sessions purged"
        );

        result
    }
}

impl<S: SessionSource> ExpiryManager for SessionManager<S> {
    fn load_sessions(&self, loader: &dyn SessionLoader) -> reclaim_session::Result<usize> {
        let _enter = self.span.enter();
        info!("Session manager loading, delegating to store");

        let restored = self.source.load(loader)?;
        debug!(restored, sessions = self.source.len(), "Session store loaded");
        Ok(restored)
    }

    fn process_expires(&self) -> SweepResult {
        self.process_expires_with_cancel(&CancellationToken::new())
    }
}
