//! Pattern intelligence for Canon.
//!
//! Dependency chain: patterns → extraction → learning → compliance,
//! and patterns → aggregation → registry.

pub mod aggregation;
pub mod compliance;
pub mod extraction;
pub mod learning;
pub mod patterns;
pub mod registry;

pub use aggregation::GlobalAggregator;
pub use compliance::ConflictDetector;
pub use learning::{IncrementalLearner, LearningScheduler};
pub use patterns::{Pattern, PatternContent, PatternType};
pub use registry::ProjectRegistry;
