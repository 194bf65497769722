//! Top-level error aggregating every subsystem error.

use super::error_code::CanonErrorCode;
use super::{
    ConfigError, DetectionError, ExtractionError, LearnError, RegistryError, StorageError,
    SyncError,
};

/// Any error an exposed operation can surface.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Learning error: {0}")]
    Learn(#[from] LearnError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CanonError {
    /// Returns true when the same call may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Sync(e) => e.is_retryable(),
            Self::Storage(StorageError::DbBusy) => true,
            Self::Learn(LearnError::Storage(StorageError::DbBusy)) => true,
            Self::Learn(LearnError::MergeFailed {
                source: StorageError::DbBusy,
                ..
            }) => true,
            _ => false,
        }
    }
}

impl CanonErrorCode for CanonError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::Extraction(e) => e.error_code(),
            Self::Learn(e) => e.error_code(),
            Self::Detection(e) => e.error_code(),
            Self::Sync(e) => e.error_code(),
            Self::Registry(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
        }
    }
}
