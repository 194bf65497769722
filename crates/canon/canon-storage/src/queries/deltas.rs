//! Learning delta log and the per-delta pattern operations used for replay.

use canon_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite_err;

/// One logged learning delta.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub id: String,
    pub trigger: String,
    pub mode: String,
    pub revision: Option<String>,
    pub files_touched: i64,
    pub concepts_added: i64,
    pub concepts_modified: i64,
    pub concepts_removed: i64,
    pub patterns_added: i64,
    pub patterns_modified: i64,
    pub patterns_removed: i64,
    pub duration_ms: i64,
    pub applied_at: i64,
    pub preceding_version: i64,
    pub resulting_version: i64,
    pub partial_degradation: bool,
    /// JSON array of paths.
    pub degraded_files: String,
}

/// A pattern mutation recorded with the delta that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaOperationRow {
    pub resulting_version: i64,
    pub seq: i64,
    /// `upsert` or `remove`.
    pub op: String,
    pub pattern_id: String,
    /// Full pattern row as JSON for upserts.
    pub payload: Option<String>,
}

pub const OP_UPSERT: &str = "upsert";
pub const OP_REMOVE: &str = "remove";

const DELTA_COLUMNS: &str = "id, trigger_kind, mode, revision, files_touched, concepts_added, \
    concepts_modified, concepts_removed, patterns_added, patterns_modified, patterns_removed, \
    duration_ms, applied_at, preceding_version, resulting_version, partial_degradation, degraded_files";

pub fn insert_delta(conn: &Connection, row: &DeltaRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO learning_deltas (id, trigger_kind, mode, revision, files_touched, concepts_added,
             concepts_modified, concepts_removed, patterns_added, patterns_modified, patterns_removed,
             duration_ms, applied_at, preceding_version, resulting_version, partial_degradation,
             degraded_files)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.id,
        row.trigger,
        row.mode,
        row.revision,
        row.files_touched,
        row.concepts_added,
        row.concepts_modified,
        row.concepts_removed,
        row.patterns_added,
        row.patterns_modified,
        row.patterns_removed,
        row.duration_ms,
        row.applied_at,
        row.preceding_version,
        row.resulting_version,
        row.partial_degradation as i64,
        row.degraded_files,
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

/// Logged deltas ordered by resulting version.
pub fn list_deltas(conn: &Connection) -> Result<Vec<DeltaRow>, StorageError> {
    let sql = format!("SELECT {DELTA_COLUMNS} FROM learning_deltas ORDER BY resulting_version ASC");
    let mut stmt = conn.prepare_cached(&sql).map_err(sqlite_err)?;
    let rows = stmt.query_map([], map_delta_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn latest_delta(conn: &Connection) -> Result<Option<DeltaRow>, StorageError> {
    let sql = format!(
        "SELECT {DELTA_COLUMNS} FROM learning_deltas ORDER BY resulting_version DESC LIMIT 1"
    );
    conn.prepare_cached(&sql)
        .map_err(sqlite_err)?
        .query_row([], map_delta_row)
        .optional()
        .map_err(sqlite_err)
}

pub fn insert_operation(conn: &Connection, row: &DeltaOperationRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO delta_operations (resulting_version, seq, op, pattern_id, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.resulting_version,
        row.seq,
        row.op,
        row.pattern_id,
        row.payload
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

/// Every recorded operation in application order.
pub fn list_operations(conn: &Connection) -> Result<Vec<DeltaOperationRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT resulting_version, seq, op, pattern_id, payload FROM delta_operations
             ORDER BY resulting_version ASC, seq ASC",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DeltaOperationRow {
                resulting_version: row.get(0)?,
                seq: row.get(1)?,
                op: row.get(2)?,
                pattern_id: row.get(3)?,
                payload: row.get(4)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

fn map_delta_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeltaRow> {
    Ok(DeltaRow {
        id: row.get(0)?,
        trigger: row.get(1)?,
        mode: row.get(2)?,
        revision: row.get(3)?,
        files_touched: row.get(4)?,
        concepts_added: row.get(5)?,
        concepts_modified: row.get(6)?,
        concepts_removed: row.get(7)?,
        patterns_added: row.get(8)?,
        patterns_modified: row.get(9)?,
        patterns_removed: row.get(10)?,
        duration_ms: row.get(11)?,
        applied_at: row.get(12)?,
        preceding_version: row.get(13)?,
        resulting_version: row.get(14)?,
        partial_degradation: row.get::<_, i64>(15)? != 0,
        degraded_files: row.get(16)?,
    })
}
