//! Errors from external collaborators (concept extraction, source reading, embedding).

use super::error_code::{self, CanonErrorCode};

/// Errors raised by the concept extractor, source reader, or embedder.
/// Learning catches these per file and flags the file as degraded.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("File too large: {path} ({size} bytes, max {max})")]
    FileTooLarge { path: String, size: u64, max: u64 },

    #[error("Extraction failed for {path}: {message}")]
    ExtractionFailed { path: String, message: String },

    #[error("Collaborator {collaborator} unavailable: {message}")]
    Unavailable {
        collaborator: String,
        message: String,
    },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl CanonErrorCode for ExtractionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => error_code::COLLABORATOR_UNAVAILABLE,
            _ => error_code::EXTRACTION_ERROR,
        }
    }
}
