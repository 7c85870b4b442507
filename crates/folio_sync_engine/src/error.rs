//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while exchanging state with the remote store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No account is configured on this replica.
    #[error("no sync account configured")]
    NotAuthenticated,

    /// Network or transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server rejected the stored credentials.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// The server answered but the body was not decodable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The server refused a push computed against a stale version.
    #[error("version conflict: the remote store advanced past the pushed base")]
    VersionConflict,

    /// The server rejected the request for another reason.
    #[error("server error: {0}")]
    Server(String),

    /// The operation exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// Not connected to the remote store.
    #[error("not connected to server")]
    NotConnected,

    /// The local replica store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the same request could succeed on a later
    /// attempt. The engine keeps no retry counters; the next natural
    /// trigger is the only retry driver.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::Server(_) => true,
            _ => false,
        }
    }

    /// Returns true if the failure must surface to the user even on a
    /// background trigger. Silent login failure would strand the
    /// replica permanently un-synced.
    pub fn always_surfaces(&self) -> bool {
        matches!(self, SyncError::NotAuthenticated | SyncError::AuthRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Server("500".into()).is_retryable());
        assert!(!SyncError::AuthRejected("bad key".into()).is_retryable());
        assert!(!SyncError::VersionConflict.is_retryable());
    }

    #[test]
    fn auth_failures_always_surface() {
        assert!(SyncError::NotAuthenticated.always_surfaces());
        assert!(SyncError::AuthRejected("bad key".into()).always_surfaces());
        assert!(!SyncError::Timeout.always_surfaces());
        assert!(!SyncError::transport_retryable("offline").always_surfaces());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SyncError::NotConnected.to_string(),
            "not connected to server"
        );
        let err = SyncError::Transport {
            message: "dns failure".into(),
            retryable: true,
        };
        assert!(err.to_string().contains("dns failure"));
    }
}
