//! In-memory session store with idle-timeout expiry.
//!
//! This crate provides the session side of the expiry sweep:
//! - [`SessionHandle`], the validity/release contract a sweep depends on
//! - [`StandardSession`], a handle with idle-timeout expiry and idempotent release
//! - [`SessionStore`], a concurrent id → handle map with release listeners
//! - [`SessionLoader`] hooks for restoring sessions at startup
//!
//! # Example
//!
//! ```rust,ignore
//! use reclaim_session::{SessionHandle, SessionStore};
//!
//! let store = SessionStore::new("ROOT").with_max_inactive(Some(Duration::from_secs(1800)));
//! let session = store.create();
//! assert!(session.is_valid()?);
//! ```

mod error;
mod handle;
mod persistence;
mod session;
mod store;

pub use error::{Result, SessionError};
pub use handle::{Release, SessionHandle};
pub use persistence::{MemoryLoader, NoPersistence, SessionLoader, SessionRecord};
pub use session::{SessionState, StandardSession};
pub use store::{SessionListener, SessionStore};
