//! Append-only pattern exceptions.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRow {
    pub id: i64,
    pub pattern_id: String,
    pub scope_glob: String,
    pub reason: String,
    pub created_at: i64,
}

/// Append an exception. Returns its row id.
pub fn insert_exception(
    conn: &Connection,
    pattern_id: &str,
    scope_glob: &str,
    reason: &str,
    created_at: i64,
) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO pattern_exceptions (pattern_id, scope_glob, reason, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .map_err(sqlite_err)?
    .execute(params![pattern_id, scope_glob, reason, created_at])
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn exceptions_for_pattern(conn: &Connection, pattern_id: &str) -> Result<Vec<ExceptionRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, pattern_id, scope_glob, reason, created_at
             FROM pattern_exceptions WHERE pattern_id = ?1 ORDER BY id",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![pattern_id], map_exception_row)
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn list_exceptions(conn: &Connection) -> Result<Vec<ExceptionRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, pattern_id, scope_glob, reason, created_at
             FROM pattern_exceptions ORDER BY id",
        )
        .map_err(sqlite_err)?;
    let rows = stmt.query_map([], map_exception_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

fn map_exception_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExceptionRow> {
    Ok(ExceptionRow {
        id: row.get(0)?,
        pattern_id: row.get(1)?,
        scope_glob: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
    })
}
