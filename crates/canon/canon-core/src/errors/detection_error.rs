//! Compliance detection and exception errors.

use super::error_code::{self, CanonErrorCode};
use super::StorageError;

/// Errors that can occur during compliance checks and exception handling.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid scope glob '{glob}': {message}")]
    InvalidGlob { glob: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CanonErrorCode for DetectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => error_code::INVALID_INPUT,
            Self::InvalidGlob { .. } => error_code::INVALID_GLOB,
            Self::Storage(e) => e.error_code(),
        }
    }
}
