//! Error types for replica-sync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating wire data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is not a well-formed relay message
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Unknown relay message type
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// EVENT frame whose payload does not decode as an event
    #[error("undecodable event for subscription {subscription_id}: {reason}")]
    UndecodableEvent {
        /// Subscription the frame was addressed to.
        subscription_id: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Event failed structural validation
    #[error("invalid event {id}: {reason}")]
    InvalidEvent {
        /// Id of the offending event (as received).
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::UnknownMessageType("AUTHX".into());
        assert_eq!(err.to_string(), "unknown message type: AUTHX");

        let err = SyncError::InvalidEvent {
            id: "abc".into(),
            reason: "id is not 64 hex chars".into(),
        };
        assert_eq!(err.to_string(), "invalid event abc: id is not 64 hex chars");

        let err = SyncError::UndecodableEvent {
            subscription_id: "sub".into(),
            reason: "missing field `sig`".into(),
        };
        assert_eq!(
            err.to_string(),
            "undecodable event for subscription sub: missing field `sig`"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
