//! Extracted concept rows, keyed by file.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptRow {
    pub file_path: String,
    pub name: String,
    pub kind: String,
    pub confidence: f64,
    pub line_start: i64,
    pub line_end: i64,
}

pub fn concepts_for_file(conn: &Connection, file_path: &str) -> Result<Vec<ConceptRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT file_path, name, kind, confidence, line_start, line_end
             FROM concepts WHERE file_path = ?1
             ORDER BY line_start, name, kind",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![file_path], |row| {
            Ok(ConceptRow {
                file_path: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                confidence: row.get(3)?,
                line_start: row.get(4)?,
                line_end: row.get(5)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn insert_concepts(conn: &Connection, rows: &[ConceptRow]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO concepts (file_path, name, kind, confidence, line_start, line_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(sqlite_err)?;
    for row in rows {
        stmt.execute(params![
            row.file_path,
            row.name,
            row.kind,
            row.confidence,
            row.line_start,
            row.line_end
        ])
        .map_err(sqlite_err)?;
    }
    Ok(())
}

/// Delete a file's concepts. Returns the number removed.
pub fn delete_file_concepts(conn: &Connection, file_path: &str) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM concepts WHERE file_path = ?1", params![file_path])
        .map_err(sqlite_err)
}

/// Re-key a file's concepts to a new path without touching their content.
pub fn rekey_concepts(conn: &Connection, from: &str, to: &str) -> Result<usize, StorageError> {
    conn.execute(
        "UPDATE concepts SET file_path = ?2 WHERE file_path = ?1",
        params![from, to],
    )
    .map_err(sqlite_err)
}

pub fn count_concepts(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))
        .map_err(sqlite_err)
}
