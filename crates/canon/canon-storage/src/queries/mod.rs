//! Query modules: one per table group, free functions over `&Connection`.
//!
//! Project store: `store_meta`, `patterns`, `concepts`, `evidence`, `files`,
//! `deltas`, `tombstones`, `exceptions`, `violations`.
//! Global database: `projects`, `aggregations`.

pub mod aggregations;
pub mod concepts;
pub mod deltas;
pub mod evidence;
pub mod exceptions;
pub mod files;
pub mod patterns;
pub mod projects;
pub mod store_meta;
pub mod tombstones;
pub mod violations;

use canon_core::errors::StorageError;

/// Map a rusqlite error into the closest `StorageError` variant.
pub fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::from_sqlite_message(e.to_string())
}
