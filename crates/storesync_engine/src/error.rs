//! Error types for the sync engine.

use storesync_diff::PatchError;
use storesync_protocol::ProtocolError;
use storesync_value::CodecError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Change records did not fit the local state.
    ///
    /// The two sides have diverged; continuing would leave them permanently
    /// out of sync.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    /// A sync message had a recognized type but malformed fields.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The message channel rejected a message.
    #[error("channel error: {message}")]
    Channel {
        /// Error message.
        message: String,
    },

    /// The message channel has been closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A reducer failed.
    #[error("reducer error: {0}")]
    Reducer(String),

    /// Records arrived from the worker but the store did not apply them.
    #[error("sync action was not applied; wrap the host reducer in ClientReducer")]
    SyncActionIgnored,

    /// Batch timers need a running tokio runtime.
    #[error("no tokio runtime available for the batch timer")]
    NoRuntime,

    /// A batch was discarded before it was flushed.
    #[error("batch dropped before flush")]
    BatchDropped,
}

impl SyncError {
    /// Creates a channel error.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Creates a reducer error.
    pub fn reducer(message: impl Into<String>) -> Self {
        Self::Reducer(message.into())
    }

    /// Returns true if the two sides can no longer be assumed consistent.
    pub fn is_desync(&self) -> bool {
        matches!(self, SyncError::Patch(_) | SyncError::SyncActionIgnored)
    }
}
