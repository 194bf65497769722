//! # canon-storage
//!
//! SQLite persistence for Canon. Each project owns one pattern store
//! database; a single global database holds the project registry and the
//! cross-project aggregations. Write-serialized, read-pooled, WAL mode.

pub mod connection;
pub mod migrations;
pub mod queries;
pub mod store;

pub use connection::DatabaseManager;
pub use migrations::Schema;
pub use store::{GlobalStore, PatternStore};
