//! Error types for sync-store.

use std::path::PathBuf;

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored column could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },

    /// A stored row holds a value outside the event model.
    #[error("corrupt row {id}: {reason}")]
    CorruptRow {
        /// Event id of the row.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
