//! Signature-keyed aggregations and per-project occurrences (global database).

use canon_core::errors::StorageError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::sqlite_err;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRow {
    pub signature: String,
    pub category: String,
    pub description: String,
    pub aggregated_confidence: f64,
    pub consensus_score: f64,
    /// Distinct projects with an occurrence.
    pub occurrence_count: i64,
    /// JSON array of language tags.
    pub languages: String,
    pub revision: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceRow {
    pub signature: String,
    pub project_id: String,
    pub pattern_id: String,
    pub frequency: i64,
    pub confidence: f64,
    /// JSON array of language tags.
    pub languages: String,
    pub updated_at: i64,
}

/// Filter for `query_aggregations`. `None` fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct AggregationQuery {
    pub category: Option<String>,
    pub min_project_count: Option<i64>,
    pub min_consensus: Option<f64>,
    pub language: Option<String>,
    pub limit: i64,
}

const COLUMNS: &str = "signature, category, description, aggregated_confidence, consensus_score, \
                       occurrence_count, languages, revision, created_at, updated_at";

pub fn get_aggregation(conn: &Connection, signature: &str) -> Result<Option<AggregationRow>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM pattern_aggregations WHERE signature = ?1");
    conn.prepare_cached(&sql)
        .map_err(sqlite_err)?
        .query_row(params![signature], map_aggregation_row)
        .optional()
        .map_err(sqlite_err)
}

/// Insert a new aggregation. Returns false if the signature already exists.
pub fn insert_aggregation(conn: &Connection, row: &AggregationRow) -> Result<bool, StorageError> {
    let changed = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO pattern_aggregations (signature, category, description,
                 aggregated_confidence, consensus_score, occurrence_count, languages, revision,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(sqlite_err)?
        .execute(params![
            row.signature,
            row.category,
            row.description,
            row.aggregated_confidence,
            row.consensus_score,
            row.occurrence_count,
            row.languages,
            row.revision,
            row.created_at,
            row.updated_at,
        ])
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

/// Compare-and-swap update: applies only if the stored revision is still
/// `expected_revision`, and bumps it by one. Returns false on a lost race.
pub fn cas_update_aggregation(
    conn: &Connection,
    row: &AggregationRow,
    expected_revision: i64,
) -> Result<bool, StorageError> {
    let changed = conn
        .prepare_cached(
            "UPDATE pattern_aggregations SET
                 description = ?2, aggregated_confidence = ?3, consensus_score = ?4,
                 occurrence_count = ?5, languages = ?6, updated_at = ?7, revision = ?8 + 1
             WHERE signature = ?1 AND revision = ?8",
        )
        .map_err(sqlite_err)?
        .execute(params![
            row.signature,
            row.description,
            row.aggregated_confidence,
            row.consensus_score,
            row.occurrence_count,
            row.languages,
            row.updated_at,
            expected_revision,
        ])
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

/// CAS-guarded consensus-only update.
pub fn cas_update_consensus(
    conn: &Connection,
    signature: &str,
    consensus: f64,
    expected_revision: i64,
    now: i64,
) -> Result<bool, StorageError> {
    let changed = conn
        .prepare_cached(
            "UPDATE pattern_aggregations SET consensus_score = ?2, updated_at = ?3, revision = ?4 + 1
             WHERE signature = ?1 AND revision = ?4",
        )
        .map_err(sqlite_err)?
        .execute(params![signature, consensus, now, expected_revision])
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

/// CAS-guarded delete of an aggregation with no occurrences left.
pub fn cas_delete_aggregation(
    conn: &Connection,
    signature: &str,
    expected_revision: i64,
) -> Result<bool, StorageError> {
    let changed = conn
        .execute(
            "DELETE FROM pattern_aggregations WHERE signature = ?1 AND revision = ?2",
            params![signature, expected_revision],
        )
        .map_err(sqlite_err)?;
    Ok(changed > 0)
}

/// Insert or replace one project's occurrence. Returns true if it replaced
/// an existing occurrence.
pub fn upsert_occurrence(conn: &Connection, row: &OccurrenceRow) -> Result<bool, StorageError> {
    let existed: bool = conn
        .prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM aggregation_occurrences
                           WHERE signature = ?1 AND project_id = ?2 AND pattern_id = ?3)",
        )
        .map_err(sqlite_err)?
        .query_row(params![row.signature, row.project_id, row.pattern_id], |r| r.get(0))
        .map_err(sqlite_err)?;
    conn.prepare_cached(
        "INSERT INTO aggregation_occurrences (signature, project_id, pattern_id, frequency,
                                              confidence, languages, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(signature, project_id, pattern_id) DO UPDATE SET
           frequency = excluded.frequency,
           confidence = excluded.confidence,
           languages = excluded.languages,
           updated_at = excluded.updated_at",
    )
    .map_err(sqlite_err)?
    .execute(params![
        row.signature,
        row.project_id,
        row.pattern_id,
        row.frequency,
        row.confidence,
        row.languages,
        row.updated_at,
    ])
    .map_err(sqlite_err)?;
    Ok(existed)
}

/// Remove a project's occurrences of a pattern. Returns the signatures touched.
pub fn delete_pattern_occurrences(
    conn: &Connection,
    project_id: &str,
    pattern_id: &str,
) -> Result<Vec<String>, StorageError> {
    let signatures = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT signature FROM aggregation_occurrences
                 WHERE project_id = ?1 AND pattern_id = ?2 ORDER BY signature",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![project_id, pattern_id], |row| row.get::<_, String>(0))
            .map_err(sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)?
    };
    conn.execute(
        "DELETE FROM aggregation_occurrences WHERE project_id = ?1 AND pattern_id = ?2",
        params![project_id, pattern_id],
    )
    .map_err(sqlite_err)?;
    Ok(signatures)
}

/// Remove every occurrence a project contributed. Returns the signatures touched.
pub fn delete_project_occurrences(conn: &Connection, project_id: &str) -> Result<Vec<String>, StorageError> {
    let signatures = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT signature FROM aggregation_occurrences
                 WHERE project_id = ?1 ORDER BY signature",
            )
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![project_id], |row| row.get::<_, String>(0))
            .map_err(sqlite_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)?
    };
    conn.execute(
        "DELETE FROM aggregation_occurrences WHERE project_id = ?1",
        params![project_id],
    )
    .map_err(sqlite_err)?;
    Ok(signatures)
}

pub fn occurrences_for(conn: &Connection, signature: &str) -> Result<Vec<OccurrenceRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT signature, project_id, pattern_id, frequency, confidence, languages, updated_at
             FROM aggregation_occurrences WHERE signature = ?1
             ORDER BY project_id, pattern_id",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![signature], |row| {
            Ok(OccurrenceRow {
                signature: row.get(0)?,
                project_id: row.get(1)?,
                pattern_id: row.get(2)?,
                frequency: row.get(3)?,
                confidence: row.get(4)?,
                languages: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Distinct active projects with an occurrence of `signature`.
pub fn active_project_count_for(conn: &Connection, signature: &str) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "SELECT COUNT(DISTINCT o.project_id) FROM aggregation_occurrences o
         JOIN projects p ON p.id = o.project_id
         WHERE o.signature = ?1 AND p.is_active = 1",
    )
    .map_err(sqlite_err)?
    .query_row(params![signature], |row| row.get(0))
    .map_err(sqlite_err)
}

/// `(signature, consensus_score, revision)` for every aggregation.
pub fn consensus_snapshot(conn: &Connection) -> Result<Vec<(String, f64, i64)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT signature, consensus_score, revision FROM pattern_aggregations ORDER BY signature",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Filtered aggregations ordered by occurrence count desc, then aggregated
/// confidence desc, then signature.
pub fn query_aggregations(
    conn: &Connection,
    query: &AggregationQuery,
) -> Result<Vec<AggregationRow>, StorageError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(category) = &query.category {
        clauses.push("category = ?");
        values.push(Value::Text(category.clone()));
    }
    if let Some(min) = query.min_project_count {
        clauses.push("occurrence_count >= ?");
        values.push(Value::Integer(min));
    }
    if let Some(min) = query.min_consensus {
        clauses.push("consensus_score >= ?");
        values.push(Value::Real(min));
    }
    if let Some(language) = &query.language {
        clauses.push("EXISTS (SELECT 1 FROM json_each(pattern_aggregations.languages) WHERE json_each.value = ?)");
        values.push(Value::Text(language.clone()));
    }
    values.push(Value::Integer(query.limit));

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {COLUMNS} FROM pattern_aggregations {where_sql}
         ORDER BY occurrence_count DESC, aggregated_confidence DESC, signature ASC
         LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql).map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params_from_iter(values), map_aggregation_row)
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn count_aggregations(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM pattern_aggregations", [], |row| row.get(0))
        .map_err(sqlite_err)
}

fn map_aggregation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AggregationRow> {
    Ok(AggregationRow {
        signature: row.get(0)?,
        category: row.get(1)?,
        description: row.get(2)?,
        aggregated_confidence: row.get(3)?,
        consensus_score: row.get(4)?,
        occurrence_count: row.get(5)?,
        languages: row.get(6)?,
        revision: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
