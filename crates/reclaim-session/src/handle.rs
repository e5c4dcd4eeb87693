//! The contract between a session store and the expiry sweep.

use crate::error::Result;

/// Outcome of a release call on a session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// This call moved the handle to its expired state.
    Released,
    /// The handle had already been released; nothing changed.
    AlreadyReleased,
}

/// A reference to one session's server-side state.
///
/// Implementations must allow [`is_valid`](Self::is_valid) and
/// [`expire`](Self::expire) to be called concurrently from several threads
/// on different handles. `is_valid` must not have side effects, and `expire`
/// must be idempotent: a second call returns [`Release::AlreadyReleased`].
pub trait SessionHandle: Send + Sync {
    /// Identifier, for diagnostics only.
    fn id(&self) -> &str;

    /// Whether the session is still live.
    ///
    /// The answer only changes with real time or an explicit invalidation
    /// made elsewhere.
    fn is_valid(&self) -> Result<bool>;

    /// Transition the session to expired and detach it from its store.
    fn expire(&self) -> Result<Release>;
}

impl<H: SessionHandle + ?Sized> SessionHandle for std::sync::Arc<H> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn is_valid(&self) -> Result<bool> {
        (**self).is_valid()
    }

    fn expire(&self) -> Result<Release> {
        (**self).expire()
    }
}
