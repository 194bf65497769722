//! Shared data types for Canon: change events, concepts, paths, collections.

pub mod change;
pub mod collections;
pub mod concept;
pub mod paths;

pub use change::{ChangeKind, FileChange, Trigger};
pub use collections::{FxHashMap, FxHashSet, SmallVec4};
pub use concept::{Concept, ConceptKind, Extraction, SourceLocation};
pub use paths::normalize_path;
