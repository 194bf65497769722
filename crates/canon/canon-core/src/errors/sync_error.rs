//! Global aggregation sync errors.

use super::error_code::{self, CanonErrorCode};
use super::StorageError;

/// Errors that can occur while syncing a project into the global aggregations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Sync already in progress for project {project_id}")]
    InProgress { project_id: String },

    #[error("Unknown project: {project_id}")]
    UnknownProject { project_id: String },

    #[error("Project {project_id} is not active")]
    Inactive { project_id: String },

    /// Part of the sync was merged; the checkpoint was advanced to the last
    /// fully merged store version and the rest can be retried.
    #[error("Sync of {project_id} interrupted at checkpoint {checkpoint}: {source}")]
    Interrupted {
        project_id: String,
        checkpoint: u64,
        #[source]
        source: StorageError,
    },

    /// The project's store is older than what was already merged, e.g. it
    /// was recreated after the last sync. Needs an explicit rebase.
    #[error(
        "Store of {project_id} is at version {store_version}, behind sync checkpoint {checkpoint}"
    )]
    StoreBehindCheckpoint {
        project_id: String,
        store_version: u64,
        checkpoint: u64,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Returns true when retrying the same sync may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InProgress { .. } | Self::Interrupted { .. } => true,
            Self::Storage(e) => matches!(e, StorageError::DbBusy),
            _ => false,
        }
    }
}

impl CanonErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InProgress { .. } => error_code::SYNC_IN_PROGRESS,
            Self::UnknownProject { .. } => error_code::UNKNOWN_PROJECT,
            Self::Inactive { .. } => error_code::PROJECT_INACTIVE,
            Self::Interrupted { .. } => error_code::SYNC_FAILED,
            Self::StoreBehindCheckpoint { .. } => error_code::CONSISTENCY_VIOLATION,
            Self::Storage(e) => e.error_code(),
        }
    }
}
