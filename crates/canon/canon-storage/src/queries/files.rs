//! Files the learner has analyzed.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFileRow {
    pub file_path: String,
    pub language: Option<String>,
    /// xxh3 hex digest of the analyzed content.
    pub content_hash: String,
    pub degraded: bool,
    pub analyzed_at: i64,
    pub revision: Option<String>,
}

pub fn upsert_tracked_file(conn: &Connection, row: &TrackedFileRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO tracked_files (file_path, language, content_hash, degraded, analyzed_at, revision)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(file_path) DO UPDATE SET
           language = excluded.language,
           content_hash = excluded.content_hash,
           degraded = excluded.degraded,
           analyzed_at = excluded.analyzed_at,
           revision = excluded.revision",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.file_path,
        row.language,
        row.content_hash,
        row.degraded as i64,
        row.analyzed_at,
        row.revision
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn get_tracked_file(conn: &Connection, file_path: &str) -> Result<Option<TrackedFileRow>, StorageError> {
    conn.prepare_cached(
        "SELECT file_path, language, content_hash, degraded, analyzed_at, revision
         FROM tracked_files WHERE file_path = ?1",
    )
    .map_err(sqlite_err)?
    .query_row(params![file_path], |row| {
        Ok(TrackedFileRow {
            file_path: row.get(0)?,
            language: row.get(1)?,
            content_hash: row.get(2)?,
            degraded: row.get::<_, i64>(3)? != 0,
            analyzed_at: row.get(4)?,
            revision: row.get(5)?,
        })
    })
    .optional()
    .map_err(sqlite_err)
}

pub fn delete_tracked_file(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM tracked_files WHERE file_path = ?1", params![file_path])
        .map_err(sqlite_err)
}

pub fn rekey_tracked_file(conn: &Connection, from: &str, to: &str) -> Result<usize, StorageError> {
    conn.execute(
        "UPDATE tracked_files SET file_path = ?2 WHERE file_path = ?1",
        params![from, to],
    )
    .map_err(sqlite_err)
}

pub fn count_tracked_files(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM tracked_files", [], |row| row.get(0))
        .map_err(sqlite_err)
}
