//! Concept extraction and observation of pattern evidence.
//!
//! The extractor collaborator turns file text into typed concepts; the
//! observation pass turns concepts and raw text into pattern observations.

pub mod languages;
pub mod lexical;
pub mod naming;
pub mod observations;
pub mod source;

pub use languages::Language;
pub use lexical::LexicalExtractor;
pub use observations::{observe, Observation};
pub use source::FsSourceReader;
