//! Project registry rows (global database).

use canon_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub id: String,
    pub path: String,
    pub name: String,
    pub primary_language: Option<String>,
    /// JSON array of framework names.
    pub frameworks: String,
    pub linked_at: i64,
    pub unlinked_at: Option<i64>,
    pub last_synced_version: i64,
    pub last_synced_at: Option<i64>,
    pub pattern_count: i64,
    pub concept_count: i64,
    pub is_active: bool,
}

const COLUMNS: &str = "id, path, name, primary_language, frameworks, linked_at, unlinked_at, \
                       last_synced_version, last_synced_at, pattern_count, concept_count, is_active";

pub fn insert_project(conn: &Connection, row: &ProjectRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO projects (id, path, name, primary_language, frameworks, linked_at, unlinked_at,
                               last_synced_version, last_synced_at, pattern_count, concept_count, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.id,
        row.path,
        row.name,
        row.primary_language,
        row.frameworks,
        row.linked_at,
        row.unlinked_at,
        row.last_synced_version,
        row.last_synced_at,
        row.pattern_count,
        row.concept_count,
        row.is_active as i64,
    ])
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn get_project(conn: &Connection, id: &str) -> Result<Option<ProjectRow>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
    conn.prepare_cached(&sql)
        .map_err(sqlite_err)?
        .query_row(params![id], map_project_row)
        .optional()
        .map_err(sqlite_err)
}

pub fn get_project_by_path(conn: &Connection, path: &str) -> Result<Option<ProjectRow>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM projects WHERE path = ?1");
    conn.prepare_cached(&sql)
        .map_err(sqlite_err)?
        .query_row(params![path], map_project_row)
        .optional()
        .map_err(sqlite_err)
}

/// Refresh metadata of an existing project and mark it active again.
/// Id and checkpoint are left untouched.
pub fn relink_project(
    conn: &Connection,
    id: &str,
    name: &str,
    primary_language: Option<&str>,
    frameworks: &str,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE projects SET name = ?2, primary_language = ?3, frameworks = ?4,
                             is_active = 1, unlinked_at = NULL
         WHERE id = ?1",
        params![id, name, primary_language, frameworks],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Soft-delete. Returns false when the project does not exist.
pub fn deactivate_project(conn: &Connection, id: &str, now: i64) -> Result<bool, StorageError> {
    let changed = conn
        .execute(
            "UPDATE projects SET is_active = 0,
                 unlinked_at = CASE WHEN is_active = 1 THEN ?2 ELSE unlinked_at END
             WHERE id = ?1",
            params![id, now],
        )
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

pub fn update_project_stats(
    conn: &Connection,
    id: &str,
    pattern_count: i64,
    concept_count: i64,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE projects SET pattern_count = ?2, concept_count = ?3 WHERE id = ?1",
        params![id, pattern_count, concept_count],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Advance the sync checkpoint. Never moves it backwards.
pub fn advance_checkpoint(conn: &Connection, id: &str, version: i64, now: i64) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE projects SET last_synced_version = MAX(last_synced_version, ?2), last_synced_at = ?3
         WHERE id = ?1",
        params![id, version, now],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

/// Move the sync checkpoint back to zero. Only for a project whose
/// occurrences were retracted in the same transaction.
pub fn reset_checkpoint(conn: &Connection, id: &str, now: i64) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE projects SET last_synced_version = 0, last_synced_at = ?2 WHERE id = ?1",
        params![id, now],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn list_projects(conn: &Connection, active_only: bool) -> Result<Vec<ProjectRow>, StorageError> {
    let sql = if active_only {
        format!("SELECT {COLUMNS} FROM projects WHERE is_active = 1 ORDER BY linked_at, id")
    } else {
        format!("SELECT {COLUMNS} FROM projects ORDER BY linked_at, id")
    };
    let mut stmt = conn.prepare_cached(&sql).map_err(sqlite_err)?;
    let rows = stmt.query_map([], map_project_row).map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn count_active_projects(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM projects WHERE is_active = 1", [], |row| row.get(0))
        .map_err(sqlite_err)
}

/// `(active projects, total patterns, total concepts)` over active projects.
pub fn portfolio_totals(conn: &Connection) -> Result<(i64, i64, i64), StorageError> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(pattern_count), 0), COALESCE(SUM(concept_count), 0)
         FROM projects WHERE is_active = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .map_err(sqlite_err)
}

/// Most common primary languages among active projects.
pub fn top_languages(conn: &Connection, limit: usize) -> Result<Vec<(String, i64)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT primary_language, COUNT(*) AS n FROM projects
             WHERE is_active = 1 AND primary_language IS NOT NULL
             GROUP BY primary_language
             ORDER BY n DESC, primary_language ASC
             LIMIT ?1",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        path: row.get(1)?,
        name: row.get(2)?,
        primary_language: row.get(3)?,
        frameworks: row.get(4)?,
        linked_at: row.get(5)?,
        unlinked_at: row.get(6)?,
        last_synced_version: row.get(7)?,
        last_synced_at: row.get(8)?,
        pattern_count: row.get(9)?,
        concept_count: row.get(10)?,
        is_active: row.get::<_, i64>(11)? != 0,
    })
}
