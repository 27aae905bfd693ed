//! Error types for the protocol crate.

use storesync_value::CodecError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while reading or writing envelopes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// A message carried a sync type but the wrong fields.
    #[error("invalid {message_type} envelope: {reason}")]
    InvalidEnvelope {
        /// The declared message type.
        message_type: String,
        /// What was wrong.
        reason: String,
    },

    /// A change record could not be read.
    #[error("invalid change record at position {position}: {reason}")]
    InvalidRecord {
        /// Position of the record in its list.
        position: usize,
        /// What was wrong.
        reason: String,
    },

    /// The bytes did not hold a sync envelope.
    #[error("not a sync envelope")]
    NotAnEnvelope,

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ProtocolError {
    /// Creates an invalid envelope error.
    pub fn invalid_envelope(message_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message_type: message_type.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(position: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            position,
            reason: reason.into(),
        }
    }
}
