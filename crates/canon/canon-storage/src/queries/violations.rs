//! Violation history, written only when a compliance check asks for it.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRow {
    pub pattern_id: String,
    pub file_path: String,
    pub line_start: i64,
    pub line_end: i64,
    pub severity: String,
    pub message: String,
    pub suggested_fix: Option<String>,
    pub checked_at: i64,
}

pub fn insert_violations(conn: &Connection, rows: &[ViolationRow]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO violation_history (pattern_id, file_path, line_start, line_end, severity,
                                            message, suggested_fix, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(sqlite_err)?;
    for row in rows {
        stmt.execute(params![
            row.pattern_id,
            row.file_path,
            row.line_start,
            row.line_end,
            row.severity,
            row.message,
            row.suggested_fix,
            row.checked_at,
        ])
        .map_err(sqlite_err)?;
    }
    Ok(())
}

pub fn violations_for_file(conn: &Connection, file_path: &str) -> Result<Vec<ViolationRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT pattern_id, file_path, line_start, line_end, severity, message, suggested_fix, checked_at
             FROM violation_history WHERE file_path = ?1
             ORDER BY checked_at DESC, id DESC",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![file_path], |row| {
            Ok(ViolationRow {
                pattern_id: row.get(0)?,
                file_path: row.get(1)?,
                line_start: row.get(2)?,
                line_end: row.get(3)?,
                severity: row.get(4)?,
                message: row.get(5)?,
                suggested_fix: row.get(6)?,
                checked_at: row.get(7)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn count_violations(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM violation_history", [], |row| row.get(0))
        .map_err(sqlite_err)
}
