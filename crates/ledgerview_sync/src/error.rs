//! Error types for the sync layer.

use ledgerview_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while fetching or refreshing a collection.
///
/// Errors are `Clone` so a single cycle outcome can be delivered to every
/// caller that was coalesced into that cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The query could not be completed (network failure, malformed
    /// response, remote-side exception).
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The entity key does not resolve to any remote record.
    #[error("not found: {key}")]
    NotFound {
        /// The key (or key/record pair) that did not resolve.
        key: String,
    },

    /// A protocol value was invalid (bad range, undecodable record).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The remote never signalled completion within the configured cap.
    #[error("remote did not signal completion after {chunks} chunks")]
    ChunkLimitExceeded {
        /// Number of chunks fetched before giving up.
        chunks: u32,
    },

    /// The cycle this caller was waiting on was discarded by a key change.
    #[error("refresh superseded by a key change")]
    Superseded,

    /// A refresh was requested before any key was set.
    #[error("no entity key has been set")]
    NoKey,

    /// Transport has been closed.
    #[error("not connected to query service")]
    NotConnected,
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

    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::ChunkLimitExceeded { .. } => true,
            _ => false,
        }
    }

    /// Returns true for failures of the query transport itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. } | SyncError::Protocol(_) | SyncError::NotConnected
        )
    }

    /// Returns true if the entity key did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}
