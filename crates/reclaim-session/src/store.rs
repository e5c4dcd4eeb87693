//! Concurrent session store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::persistence::{SessionLoader, SessionRecord};
use crate::session::StandardSession;

/// Callbacks fired by a store as sessions come and go.
pub trait SessionListener: Send + Sync {
    /// A session was created through [`SessionStore::create`].
    fn session_created(&self, _session: &StandardSession) {}

    /// A session was released. Fired exactly once per session.
    fn session_destroyed(&self, session: &StandardSession);
}

/// State shared between a store and the sessions it hands out.
pub(crate) struct StoreShared {
    name: String,
    sessions: DashMap<String, Arc<StandardSession>>,
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
}

impl StoreShared {
    /// Remove a released session and notify listeners.
    ///
    /// Only removes the map entry if it still points at `session`, so a
    /// session re-registered under the same id is left alone.
    pub(crate) fn detach(&self, session: &StandardSession) {
        self.sessions
            .remove_if(session.id(), |_, current| std::ptr::eq(Arc::as_ptr(current), session));

        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.session_destroyed(session);
        }
    }
}

/// Concurrent map of session id to [`StandardSession`].
///
/// All operations go through the map's per-shard locking; nothing here
/// takes a lock over the whole store. Released sessions detach themselves,
/// so the store never needs to be told about expiry.
pub struct SessionStore {
    shared: Arc<StoreShared>,
    max_inactive: Option<Duration>,
}

impl SessionStore {
    /// Create an empty store. `name` identifies the owning context in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                name: name.into(),
                sessions: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
            }),
            max_inactive: None,
        }
    }

    /// Set the default idle timeout for sessions created by this store.
    pub fn with_max_inactive(mut self, max_inactive: Option<Duration>) -> Self {
        self.max_inactive = max_inactive;
        self
    }

    /// Context name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Default idle timeout for new sessions.
    pub fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive
    }

    /// Register a listener for session lifecycle events.
    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Create a session with the store's default idle timeout.
    pub fn create(&self) -> Arc<StandardSession> {
        self.create_with(self.max_inactive)
    }

    /// Create a session with an explicit idle timeout.
    pub fn create_with(&self, max_inactive: Option<Duration>) -> Arc<StandardSession> {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(StandardSession::new(
            id.clone(),
            max_inactive,
            Arc::downgrade(&self.shared),
        ));
        self.shared.sessions.insert(id, Arc::clone(&session));

        let listeners = self.shared.listeners.read().clone();
        for listener in &listeners {
            listener.session_created(&session);
        }

        session
    }

    /// Rebuild a session from a record and register it.
    pub fn restore(&self, record: SessionRecord) -> Result<Arc<StandardSession>> {
        match self.shared.sessions.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(SessionError::Duplicate(record.id)),
            Entry::Vacant(slot) => {
                let session = Arc::new(StandardSession::from_record(
                    &record,
                    Arc::downgrade(&self.shared),
                ));
                slot.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    /// Restore every session the loader provides.
    ///
    /// Duplicate ids are skipped with a warning; loader errors propagate.
    /// Returns the number of sessions restored.
    pub fn load(&self, loader: &dyn SessionLoader) -> Result<usize> {
        let records = loader.load()?;
        let total = records.len();
        let mut restored = 0;

        for record in records {
            match self.restore(record) {
                Ok(_) => restored += 1,
                Err(SessionError::Duplicate(id)) => {
                    warn!(context = %self.name(), session_id = %id, "Skipping duplicate session on load");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            context = %self.name(),
            restored,
            skipped = total - restored,
            "Sessions restored from loader"
        );
        Ok(restored)
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<Arc<StandardSession>> {
        self.shared.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Check whether a session id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.shared.sessions.contains_key(id)
    }

    /// Unregister a session without releasing it.
    ///
    /// The session leaves the active state before its entry is dropped, so
    /// a sweep still holding it in an older view reports it as already
    /// released and fires no listeners. Returns `None` if the id is unknown
    /// or the session was released first.
    pub fn remove(&self, id: &str) -> Option<Arc<StandardSession>> {
        let session = self.get(id)?;
        if !session.mark_removed() {
            return None;
        }
        self.shared
            .sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, &session));
        Some(session)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.sessions.is_empty()
    }

    /// Handles registered at the time of the call.
    ///
    /// Shards are read one at a time, so sessions inserted or removed while
    /// the snapshot is taken may or may not appear in it. Each session
    /// appears at most once.
    pub fn snapshot(&self) -> Vec<Arc<StandardSession>> {
        self.shared
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("name", &self.shared.name)
            .field("sessions", &self.shared.sessions.len())
            .field("max_inactive", &self.max_inactive)
            .finish()
    }
}
