//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;

/// SmallVec for per-key locations inside one file (usually <4).
pub type SmallVec4<T> = SmallVec<[T; 4]>;
