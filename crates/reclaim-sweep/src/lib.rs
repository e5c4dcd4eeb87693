//! Expiry sweep for in-memory session stores.
//!
//! A sweep pass takes a snapshot of a store's handles, checks each one's
//! validity on a bounded pool of workers, and releases the invalid ones.
//! One malformed session never stops the rest of the pass from being
//! reclaimed.
//!
//! - [`SweepEngine`] runs single passes over a view and keeps cumulative timing
//! - [`SessionManager`] wires an engine to a store behind the
//!   [`ExpiryManager`] entry points (`load_sessions`, `process_expires`)
//!
//! # Example
//!
//! ```rust,ignore
//! use reclaim_sweep::{ExpiryManager, SessionManager, SweepConfig};
//!
//! let store = Arc::new(SessionStore::new("ROOT"));
//! let manager = SessionManager::new(store, SweepConfig::default().with_batch_size(512));
//! let result = manager.process_expires();
//! ```

mod config;
mod engine;
mod manager;
mod result;

pub use config::{DEFAULT_BATCH_SIZE, ParseStrategyError, SweepConfig, SweepStrategy};
pub use engine::SweepEngine;
pub use manager::{ExpiryManager, SessionManager, SessionSource};
pub use result::{SweepOutcome, SweepResult};

pub use tokio_util::sync::CancellationToken;
