//! Standard session handle with idle-timeout expiry.

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tracing::trace;

use crate::error::Result;
use crate::handle::{Release, SessionHandle};
use crate::persistence::SessionRecord;
use crate::store::StoreShared;

/// Lifecycle state of a [`StandardSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Live, or idle but not yet released.
    Active = 0,
    /// Released; detached from its store.
    Expired = 1,
    /// Taken out of its store without being released. Never purged.
    Removed = 2,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SessionState::Expired,
            2 => SessionState::Removed,
            _ => SessionState::Active,
        }
    }
}

/// A session that expires after a period of inactivity.
///
/// Last-access time and lifecycle state are atomics, so request threads can
/// [`touch`](Self::touch) a session while a sweep evaluates it. Release is a
/// single compare-and-swap from [`SessionState::Active`] to
/// [`SessionState::Expired`]; only the caller that wins it detaches the
/// session and notifies listeners. [`SessionStore::remove`] moves a session
/// to [`SessionState::Removed`] with the same swap, so a sweep holding an
/// older view cannot release it afterwards.
///
/// [`SessionStore::remove`]: crate::SessionStore::remove
pub struct StandardSession {
    id: String,
    created_at: DateTime<Utc>,
    /// Milliseconds since the Unix epoch.
    last_accessed_ms: AtomicI64,
    /// `None` never expires by idle time.
    max_inactive: Option<Duration>,
    state: AtomicU8,
    store: Weak<StoreShared>,
}

impl StandardSession {
    pub(crate) fn new(
        id: String,
        max_inactive: Option<Duration>,
        store: Weak<StoreShared>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_accessed_ms: AtomicI64::new(now.timestamp_millis()),
            max_inactive: max_inactive.filter(|d| !d.is_zero()),
            state: AtomicU8::new(SessionState::Active as u8),
            store,
        }
    }

    pub(crate) fn from_record(record: &SessionRecord, store: Weak<StoreShared>) -> Self {
        Self {
            id: record.id.clone(),
            created_at: record.created_at,
            last_accessed_ms: AtomicI64::new(record.last_accessed_at.timestamp_millis()),
            max_inactive: record.max_inactive(),
            state: AtomicU8::new(SessionState::Active as u8),
            store,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last accessed.
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        let ms = self.last_accessed_ms.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(self.created_at)
    }

    /// Maximum idle time before the session becomes invalid.
    pub fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the session has been released.
    pub fn is_expired(&self) -> bool {
        self.state() == SessionState::Expired
    }

    /// Whether the session is neither released nor removed from its store.
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Record an access, resetting the idle timer.
    ///
    /// Has no effect once the session has left the active state.
    pub fn touch(&self) {
        if !self.is_active() {
            return;
        }
        self.last_accessed_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::AcqRel);
    }

    /// Time since the last access.
    pub fn idle_time(&self) -> Duration {
        idle_since(
            self.last_accessed_ms.load(Ordering::Acquire),
            Utc::now().timestamp_millis(),
        )
    }

    /// Explicitly invalidate the session, releasing it immediately.
    pub fn invalidate(&self) -> Release {
        self.release()
    }

    /// Whether the session is live at `now_ms` (milliseconds since the epoch).
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.max_inactive {
            None => true,
            Some(max) => {
                let idle = idle_since(self.last_accessed_ms.load(Ordering::Acquire), now_ms);
                idle < max
            }
        }
    }

    /// Snapshot this session as a restorable record.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord::new(self.id.clone())
            .with_created_at(self.created_at)
            .with_last_accessed_at(self.last_accessed_at())
            .with_max_inactive(self.max_inactive)
    }

    /// Move out of the active state without notifying anyone.
    ///
    /// Returns `false` if the session was already released or removed.
    pub(crate) fn mark_removed(&self) -> bool {
        self.leave_active(SessionState::Removed)
    }

    fn leave_active(&self, next: SessionState) -> bool {
        self.state
            .compare_exchange(
                SessionState::Active as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn release(&self) -> Release {
        if !self.leave_active(SessionState::Expired) {
            return Release::AlreadyReleased;
        }

        trace!(session_id = %self.id, "Session released");
        if let Some(store) = self.store.upgrade() {
            store.detach(self);
        }
        Release::Released
    }
}

impl SessionHandle for StandardSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_valid(&self) -> Result<bool> {
        Ok(self.is_live_at(Utc::now().timestamp_millis()))
    }

    fn expire(&self) -> Result<Release> {
        Ok(self.release())
    }
}

impl fmt::Debug for StandardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("last_accessed_at", &self.last_accessed_at())
            .field("max_inactive", &self.max_inactive)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn idle_since(last_ms: i64, now_ms: i64) -> Duration {
    // Clock steps backwards count as zero idle time.
    let idle = now_ms.saturating_sub(last_ms).max(0);
    Duration::from_millis(idle as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached(max_inactive: Option<Duration>) -> StandardSession {
        StandardSession::new("session-1".to_string(), max_inactive, Weak::new())
    }

    #[test]
    fn test_new_session_is_valid() {
        let session = detached(Some(Duration::from_secs(60)));
        assert!(session.is_valid().unwrap());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_no_max_inactive_never_expires() {
        let session = detached(None);
        let far_future = Utc::now().timestamp_millis() + 365 * 24 * 3_600_000;
        assert!(session.is_live_at(far_future));
    }

    #[test]
    fn test_zero_max_inactive_means_no_timeout() {
        let session = detached(Some(Duration::ZERO));
        assert_eq!(session.max_inactive(), None);
    }

    #[test]
    fn test_idle_past_max_inactive_is_invalid() {
        let session = detached(Some(Duration::from_secs(60)));
        let now = Utc::now().timestamp_millis();
        assert!(session.is_live_at(now + 59_000));
        assert!(!session.is_live_at(now + 60_000 + 1_000));
    }

    #[test]
    fn test_validity_check_has_no_side_effects() {
        let record = SessionRecord::new("stale")
            .with_last_accessed_at(Utc::now() - chrono::Duration::hours(1))
            .with_max_inactive(Some(Duration::from_secs(60)));
        let session = StandardSession::from_record(&record, Weak::new());

        assert!(!session.is_valid().unwrap());
        assert!(!session.is_valid().unwrap());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_expire_is_idempotent() {
        let session = detached(Some(Duration::from_secs(60)));
        assert_eq!(session.expire().unwrap(), Release::Released);
        assert_eq!(session.expire().unwrap(), Release::AlreadyReleased);
        assert_eq!(session.invalidate(), Release::AlreadyReleased);
        assert!(!session.is_valid().unwrap());
    }

    #[test]
    fn test_removed_session_cannot_be_released() {
        let session = detached(Some(Duration::from_secs(60)));
        assert!(session.mark_removed());
        assert!(!session.mark_removed());

        assert_eq!(session.state(), SessionState::Removed);
        assert!(!session.is_expired());
        assert_eq!(session.expire().unwrap(), Release::AlreadyReleased);
        assert_eq!(session.state(), SessionState::Removed);
    }

    #[test]
    fn test_touch_resets_idle_timer() {
        let record = SessionRecord::new("idle")
            .with_last_accessed_at(Utc::now() - chrono::Duration::minutes(5))
            .with_max_inactive(Some(Duration::from_secs(60)));
        let session = StandardSession::from_record(&record, Weak::new());
        assert!(!session.is_valid().unwrap());

        session.touch();
        assert!(session.is_valid().unwrap());
        assert!(session.idle_time() < Duration::from_secs(5));
    }

    #[test]
    fn test_touch_after_release_is_ignored() {
        let record = SessionRecord::new("gone")
            .with_last_accessed_at(Utc::now() - chrono::Duration::minutes(5));
        let session = StandardSession::from_record(&record, Weak::new());
        let before = session.last_accessed_at();

        session.invalidate();
        session.touch();
        assert_eq!(session.last_accessed_at(), before);
    }

    #[test]
    fn test_concurrent_release_wins_once() {
        let session = std::sync::Arc::new(detached(None));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = std::sync::Arc::clone(&session);
                std::thread::spawn(move || s.expire().unwrap())
            })
            .collect();

        let released = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| *r == Release::Released)
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn test_to_record_round_trips_timestamps() {
        let session = detached(Some(Duration::from_secs(90)));
        let record = session.to_record();
        assert_eq!(record.id, "session-1");
        assert_eq!(record.max_inactive_secs, 90);
        assert_eq!(record.created_at, session.created_at());
    }
}
