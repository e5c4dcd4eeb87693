//! Loader hooks for restoring sessions at startup.
//!
//! The store does not own a persistence format. A [`SessionLoader`] hands it
//! [`SessionRecord`]s and the store rebuilds live handles from them; records
//! whose idle time has already elapsed are restored as-is and left for the
//! next expiry sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Restorable state of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the session was last accessed.
    pub last_accessed_at: DateTime<Utc>,

    /// Maximum idle time in seconds. Zero or negative never expires.
    pub max_inactive_secs: i64,
}

impl SessionRecord {
    /// Create a record for a session created and accessed now, with no timeout.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_accessed_at: now,
            max_inactive_secs: -1,
        }
    }

    /// Set creation timestamp.
    pub fn with_created_at(mut self, ts: DateTime<Utc>) -> Self {
        self.created_at = ts;
        self
    }

    /// Set last-access timestamp.
    pub fn with_last_accessed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.last_accessed_at = ts;
        self
    }

    /// Set the idle timeout (`None` never expires).
    pub fn with_max_inactive(mut self, max_inactive: Option<Duration>) -> Self {
        self.max_inactive_secs = match max_inactive {
            Some(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            None => -1,
        };
        self
    }

    /// Idle timeout as a duration.
    pub fn max_inactive(&self) -> Option<Duration> {
        u64::try_from(self.max_inactive_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Trait for session restore backends.
///
/// Called once when the owning manager loads, before any sweep runs. Errors
/// propagate unchanged to the caller.
pub trait SessionLoader: Send + Sync {
    /// Load every persisted session.
    fn load(&self) -> Result<Vec<SessionRecord>>;
}

/// A no-op loader for purely in-memory stores.
#[derive(Debug, Clone, Default)]
pub struct NoPersistence;

impl SessionLoader for NoPersistence {
    fn load(&self) -> Result<Vec<SessionRecord>> {
        Ok(Vec::new())
    }
}

/// A loader that hands out a fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    records: Vec<SessionRecord>,
}

impl MemoryLoader {
    /// Create a loader over the given records.
    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    /// Number of records this loader will restore.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the loader has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionLoader for MemoryLoader {
    fn load(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_max_inactive_conversion() {
        let record = SessionRecord::new("s").with_max_inactive(Some(Duration::from_secs(30)));
        assert_eq!(record.max_inactive_secs, 30);
        assert_eq!(record.max_inactive(), Some(Duration::from_secs(30)));

        let record = record.with_max_inactive(None);
        assert_eq!(record.max_inactive(), None);

        let mut record = SessionRecord::new("s");
        record.max_inactive_secs = 0;
        assert_eq!(record.max_inactive(), None);
    }

    #[test]
    fn test_no_persistence_loads_nothing() {
        assert!(NoPersistence.load().unwrap().is_empty());
    }

    #[test]
    fn test_memory_loader_returns_records() {
        let loader = MemoryLoader::new(vec![SessionRecord::new("a"), SessionRecord::new("b")]);
        assert_eq!(loader.len(), 2);

        let ids: Vec<String> = loader.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
