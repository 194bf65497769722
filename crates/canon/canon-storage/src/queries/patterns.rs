//! Learned pattern rows.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite_err;

/// A stored pattern. `content`, `contexts` and `examples` are JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRow {
    pub pattern_id: String,
    pub pattern_type: String,
    pub slot: String,
    pub content: String,
    pub frequency: i64,
    pub baseline: i64,
    pub confidence: f64,
    pub contexts: String,
    pub examples: String,
    pub version: i64,
    pub created_at: i64,
    pub last_seen: i64,
}

const COLUMNS: &str = "pattern_id, pattern_type, slot, content, frequency, baseline, confidence, \
                       contexts, examples, version, created_at, last_seen";

/// Insert or replace a pattern.
pub fn upsert_pattern(conn: &Connection, row: &PatternRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO patterns (pattern_id, pattern_type, slot, content, frequency, baseline, confidence,
                               contexts, examples, version, created_at, last_seen)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(pattern_id) DO UPDATE SET
           frequency = excluded.frequency,
           baseline = excluded.baseline,
           confidence = excluded.confidence,
           contexts = excluded.contexts,
           examples = excluded.examples,
           version = excluded.version,
           last_seen = excluded.last_seen",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.pattern_id,
        row.pattern_type,
        row.slot,
        row.content,
        row.frequency,
        row.baseline,
        row.confidence,
        row.contexts,
        row.examples,
        row.version,
        row.created_at,
        row.last_seen,
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

/// Delete a pattern. Returns true if a row was removed.
pub fn delete_pattern(conn: &Connection, pattern_id: &str) -> Result<bool, StorageError> {
    let changed = conn
        .execute("DELETE FROM patterns WHERE pattern_id = ?1", params![pattern_id])
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

pub fn get_pattern(conn: &Connection, pattern_id: &str) -> Result<Option<PatternRow>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM patterns WHERE pattern_id = ?1");
    conn.prepare_cached(&sql)
        .map_err(sqlite_err)?
        .query_row(params![pattern_id], map_pattern_row)
        .optional()
        .map_err(sqlite_err)
}

/// All patterns, ordered by id.
pub fn list_patterns(conn: &Connection) -> Result<Vec<PatternRow>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM patterns ORDER BY pattern_id");
    let mut stmt = conn.prepare_cached(&sql).map_err(sqlite_err)?;
    let rows = stmt.query_map([], map_pattern_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Patterns competing for one observation slot.
pub fn patterns_in_slot(conn: &Connection, slot: &str) -> Result<Vec<PatternRow>, StorageError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM patterns WHERE slot = ?1
         ORDER BY frequency DESC, confidence DESC, pattern_id ASC"
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqlite_err)?;
    let rows = stmt.query_map(params![slot], map_pattern_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Patterns changed by merges after `version`, oldest change first.
pub fn patterns_since(conn: &Connection, version: i64) -> Result<Vec<PatternRow>, StorageError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM patterns WHERE version > ?1 ORDER BY version ASC, pattern_id ASC"
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqlite_err)?;
    let rows = stmt.query_map(params![version], map_pattern_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn count_patterns(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM patterns", [], |row| row.get(0))
        .map_err(sqlite_err)
}

fn map_pattern_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatternRow> {
    Ok(PatternRow {
        pattern_id: row.get(0)?,
        pattern_type: row.get(1)?,
        slot: row.get(2)?,
        content: row.get(3)?,
        frequency: row.get(4)?,
        baseline: row.get(5)?,
        confidence: row.get(6)?,
        contexts: row.get(7)?,
        examples: row.get(8)?,
        version: row.get(9)?,
        created_at: row.get(10)?,
        last_seen: row.get(11)?,
    })
}
