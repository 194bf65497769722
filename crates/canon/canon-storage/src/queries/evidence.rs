//! Evidence rows: one observation of a pattern in one file at one line.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRow {
    pub pattern_id: String,
    pub file_path: String,
    pub line: i64,
    pub snippet: String,
}

pub fn evidence_for_file(conn: &Connection, file_path: &str) -> Result<Vec<EvidenceRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT pattern_id, file_path, line, snippet FROM evidence
             WHERE file_path = ?1 ORDER BY pattern_id, line, snippet",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![file_path], map_evidence_row)
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn insert_evidence(conn: &Connection, rows: &[EvidenceRow]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO evidence (pattern_id, file_path, line, snippet) VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(sqlite_err)?;
    for row in rows {
        stmt.execute(params![row.pattern_id, row.file_path, row.line, row.snippet])
            .map_err(sqlite_err)?;
    }
    Ok(())
}

pub fn delete_file_evidence(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM evidence WHERE file_path = ?1", params![file_path])
        .map_err(sqlite_err)
}

pub fn rekey_evidence(conn: &Connection, from: &str, to: &str) -> Result<usize, StorageError> {
    conn.execute(
        "UPDATE evidence SET file_path = ?2 WHERE file_path = ?1",
        params![from, to],
    )
    .map_err(sqlite_err)
}

/// Number of evidence rows corroborating a pattern.
pub fn count_for_pattern(conn: &Connection, pattern_id: &str) -> Result<i64, StorageError> {
    conn.prepare_cached("SELECT COUNT(*) FROM evidence WHERE pattern_id = ?1")
        .map_err(sqlite_err)?
        .query_row(params![pattern_id], |row| row.get(0))
        .map_err(sqlite_err)
}

/// First `limit` evidence rows for a pattern in a stable order.
pub fn examples_for_pattern(
    conn: &Connection,
    pattern_id: &str,
    limit: usize,
) -> Result<Vec<EvidenceRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT pattern_id, file_path, line, snippet FROM evidence
             WHERE pattern_id = ?1 ORDER BY file_path, line, snippet LIMIT ?2",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![pattern_id, limit as i64], map_evidence_row)
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Distinct files with evidence for a pattern, joined with their language.
pub fn files_for_pattern(
    conn: &Connection,
    pattern_id: &str,
) -> Result<Vec<(String, Option<String>)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT DISTINCT e.file_path, f.language FROM evidence e
             LEFT JOIN tracked_files f ON f.file_path = e.file_path
             WHERE e.pattern_id = ?1 ORDER BY e.file_path",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![pattern_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

fn map_evidence_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvidenceRow> {
    Ok(EvidenceRow {
        pattern_id: row.get(0)?,
        file_path: row.get(1)?,
        line: row.get(2)?,
        snippet: row.get(3)?,
    })
}
