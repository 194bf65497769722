//! Store handles: explicit, owned by their caller, passed into each operation.
//!
//! Lifecycle is open → active → drop; dropping a file-backed store
//! checkpoints its WAL.

pub mod global_store;
pub mod pattern_store;

pub use global_store::GlobalStore;
pub use pattern_store::PatternStore;
