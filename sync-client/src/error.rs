//! Error types for sync-client.

use std::sync::Arc;
use sync_store::StoreError;
use thiserror::Error;

/// Errors a sync pass can hand back to its waiters.
///
/// Cloneable so a single failure reaches every coalesced caller.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The local store failed; nothing from this pass was committed.
    #[error("storage error: {0}")]
    Storage(Arc<StoreError>),

    /// The pass ended without reporting a result.
    #[error("coordinator error: {0}")]
    Coordinator(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Storage(Arc::new(err))
    }
}
