//! Concept extraction collaborator.

use crate::errors::ExtractionError;
use crate::types::Extraction;

/// Turns raw file text into typed, confidence-scored concepts.
///
/// Implementations must be deterministic for identical input. Unsupported
/// file types return an empty concept list with `degraded = true` rather than
/// an error; errors are reserved for genuine failures and make the learner
/// skip the file.
pub trait ConceptExtractor: Send + Sync {
    fn extract(&self, file_path: &str, content: &str) -> Result<Extraction, ExtractionError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str {
        "extractor"
    }
}
