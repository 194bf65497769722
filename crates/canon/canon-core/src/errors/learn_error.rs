//! Incremental learning errors.

use super::error_code::{self, CanonErrorCode};
use super::StorageError;

/// Errors that can occur while processing a change batch.
#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    #[error("Invalid change batch: {reason}")]
    InvalidBatch { reason: String },

    /// The merge transaction failed; the delta was discarded and the store
    /// remains at `preceding_version`.
    #[error("Merge failed at version {preceding_version}: {source}")]
    MergeFailed {
        preceding_version: u64,
        #[source]
        source: StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Learning cancelled")]
    Cancelled,
}

impl CanonErrorCode for LearnError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBatch { .. } => error_code::INVALID_INPUT,
            Self::MergeFailed { source, .. } => match source {
                StorageError::ConsistencyViolation { .. } => error_code::CONSISTENCY_VIOLATION,
                _ => error_code::MERGE_FAILED,
            },
            Self::Storage(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
