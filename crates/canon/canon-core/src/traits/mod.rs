//! Collaborator traits: concept extraction, source reading, embedding, cancellation.

pub mod cancellation;
pub mod embedder;
pub mod extractor;
pub mod source;

pub use cancellation::{Cancellable, CancellationToken};
pub use embedder::Embedder;
pub use extractor::ConceptExtractor;
pub use source::SourceReader;
