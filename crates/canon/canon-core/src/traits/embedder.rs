//! Text embedding collaborator.

use crate::errors::ExtractionError;

/// Maps text to a fixed-length vector. Only used for optional semantic
/// ranking of aggregations.
pub trait Embedder: Send + Sync {
    /// Length of every vector returned by `embed`.
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractionError>;
}
