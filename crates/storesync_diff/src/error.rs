//! Error types for patch application.

use storesync_value::{Kind, Path};
use thiserror::Error;

/// Result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// A change record that does not fit the value it is applied to.
///
/// Every variant is fatal: skipping the record would leave the two sides
/// permanently out of sync.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    /// An intermediate location of the path does not exist.
    #[error("path {path} does not resolve at {missing}")]
    PathNotFound {
        /// Path of the record.
        path: Path,
        /// Prefix of the path that failed to resolve.
        missing: Path,
    },

    /// The path passes through a scalar.
    #[error("path {path} passes through a {kind} at {at}")]
    NotAContainer {
        /// Path of the record.
        path: Path,
        /// Prefix of the path that holds the scalar.
        at: Path,
        /// Kind of the scalar.
        kind: Kind,
    },

    /// A key segment addressed an array or an index segment addressed an object.
    #[error("path {path} addresses a {kind} with the wrong segment type at {at}")]
    SegmentMismatch {
        /// Path of the record.
        path: Path,
        /// Prefix of the path where the mismatch happened.
        at: Path,
        /// Kind of the container.
        kind: Kind,
    },

    /// An array index is past the end of the array.
    #[error("index {index} out of bounds for array of length {len} at {path}")]
    IndexOutOfBounds {
        /// Path of the array.
        path: Path,
        /// Offending index.
        index: usize,
        /// Length of the array.
        len: usize,
    },

    /// An array item record points at something other than an array.
    #[error("expected array at {path}, found {kind}")]
    NotAnArray {
        /// Path of the record.
        path: Path,
        /// Kind found at the path.
        kind: Kind,
    },
}

impl PatchError {
    /// Returns the path of the record that failed.
    pub fn path(&self) -> &Path {
        match self {
            PatchError::PathNotFound { path, .. }
            | PatchError::NotAContainer { path, .. }
            | PatchError::SegmentMismatch { path, .. }
            | PatchError::IndexOutOfBounds { path, .. }
            | PatchError::NotAnArray { path, .. } => path,
        }
    }
}
