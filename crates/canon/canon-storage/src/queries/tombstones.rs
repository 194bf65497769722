//! Removal tombstones read by sync to retract occurrences.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct TombstoneRow {
    pub pattern_id: String,
    pub version: i64,
    pub pattern_type: String,
    /// Pattern content JSON at the time of removal.
    pub content: String,
    pub removed_at: i64,
}

pub fn insert_tombstone(conn: &Connection, row: &TombstoneRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT OR REPLACE INTO pattern_tombstones (pattern_id, version, pattern_type, content, removed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.pattern_id,
        row.version,
        row.pattern_type,
        row.content,
        row.removed_at
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

/// Tombstones written by merges after `version`, oldest first.
pub fn tombstones_since(conn: &Connection, version: i64) -> Result<Vec<TombstoneRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT pattern_id, version, pattern_type, content, removed_at
             FROM pattern_tombstones WHERE version > ?1
             ORDER BY version ASC, pattern_id ASC",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![version], |row| {
            Ok(TombstoneRow {
                pattern_id: row.get(0)?,
                version: row.get(1)?,
                pattern_type: row.get(2)?,
                content: row.get(3)?,
                removed_at: row.get(4)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}
