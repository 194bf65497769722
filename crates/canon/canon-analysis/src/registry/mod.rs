//! Linked projects and their sync checkpoints.

pub mod project_registry;
pub mod types;

pub use project_registry::ProjectRegistry;
pub use types::{LinkOutcome, Project, ProjectMetadata};
