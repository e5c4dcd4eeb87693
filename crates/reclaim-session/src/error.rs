//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session with this id is already registered.
    #[error("Session already exists: {0}")]
    Duplicate(String),

    /// Session was not found in the store.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// A session's state could not be evaluated or released.
    #[error("Session {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    /// Error from the loader backend.
    #[error("Load error: {0}")]
    Load(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
