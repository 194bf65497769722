//! Store version bookkeeping.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

/// Current pattern store version (0 for a fresh store).
pub fn current_version(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT value FROM store_meta WHERE name = 'version'",
        [],
        |row| row.get(0),
    )
    .map_err(sqlite_err)
}

/// Move the store version from `expected` to `next`.
///
/// Fails with `ConsistencyViolation` when another writer already moved the
/// version, or when `next` does not directly follow `expected`.
pub fn advance_version(conn: &Connection, expected: i64, next: i64) -> Result<(), StorageError> {
    if next != expected + 1 {
        return Err(StorageError::ConsistencyViolation {
            expected: (expected + 1) as u64,
            found: next.max(0) as u64,
        });
    }
    let changed = conn
        .execute(
            "UPDATE store_meta SET value = ?2 WHERE name = 'version' AND value = ?1",
            params![expected, next],
        )
        .map_err(sqlite_err)?;
    if changed == 0 {
        let found = current_version(conn)?;
        return Err(StorageError::ConsistencyViolation {
            expected: expected.max(0) as u64,
            found: found.max(0) as u64,
        });
    }
    Ok(())
}
