//! Project registry errors.

use super::error_code::{self, CanonErrorCode};
use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown project: {project_id}")]
    UnknownProject { project_id: String },

    #[error("Invalid project path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CanonErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownProject { .. } => error_code::UNKNOWN_PROJECT,
            Self::InvalidPath { .. } => error_code::INVALID_INPUT,
            Self::Storage(e) => e.error_code(),
        }
    }
}
