//! Aggregated confidence, consensus, and the compare-and-swap writes that
//! keep one aggregation row per signature consistent.
//!
//! Every write recomputes from the full occurrence list; nothing is
//! maintained incrementally.

use std::collections::BTreeSet;

use canon_core::errors::StorageError;
use canon_storage::queries::aggregations::{self, AggregationRow};
use canon_storage::queries::projects;
use rusqlite::Connection;

use super::types::Occurrence;
use crate::patterns::types::to_json;

/// Frequency-weighted mean confidence. Falls back to the plain mean when
/// every frequency is zero; an empty list scores zero.
pub fn weighted_confidence(occurrences: &[Occurrence]) -> f64 {
    if occurrences.is_empty() {
        return 0.0;
    }
    let total: f64 = occurrences.iter().map(|o| o.frequency as f64).sum();
    let mean = if total > 0.0 {
        occurrences
            .iter()
            .map(|o| o.frequency as f64 * o.confidence)
            .sum::<f64>()
            / total
    } else {
        occurrences.iter().map(|o| o.confidence).sum::<f64>() / occurrences.len() as f64
    };
    mean.clamp(0.0, 1.0)
}

/// Fraction of active projects exhibiting a signature.
pub fn consensus(exhibiting: u64, active: u64) -> f64 {
    if active == 0 {
        return 0.0;
    }
    (exhibiting as f64 / active as f64).clamp(0.0, 1.0)
}

/// Sorted union of the occurrences' languages.
pub fn merged_languages(occurrences: &[Occurrence]) -> Vec<String> {
    occurrences
        .iter()
        .flat_map(|o| o.languages.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Category and description for a signature seen for the first time.
#[derive(Debug, Clone, Copy)]
pub struct SignatureMeta<'a> {
    pub category: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Inserted,
    Updated,
    Deleted,
    /// No row and no occurrences, or no metadata to create one from.
    Absent,
}

/// Rewrite one aggregation row from its occurrences.
///
/// Returns the outcome and the number of lost compare-and-swap races.
pub fn refresh_aggregation(
    conn: &Connection,
    signature: &str,
    meta: Option<SignatureMeta<'_>>,
    max_attempts: u32,
    now: i64,
) -> Result<(Refresh, u32), StorageError> {
    let mut retries = 0u32;
    let mut last_expected = 0i64;

    for _ in 0..max_attempts.max(1) {
        let occurrence_rows = aggregations::occurrences_for(conn, signature)?;
        let existing = aggregations::get_aggregation(conn, signature)?;

        if occurrence_rows.is_empty() {
            let Some(current) = existing else {
                return Ok((Refresh::Absent, retries));
            };
            if aggregations::cas_delete_aggregation(conn, signature, current.revision)? {
                return Ok((Refresh::Deleted, retries));
            }
            last_expected = current.revision;
            retries += 1;
            continue;
        }

        let occurrences = occurrence_rows
            .iter()
            .map(Occurrence::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let exhibiting = aggregations::active_project_count_for(conn, signature)?.max(0) as u64;
        let active = projects::count_active_projects(conn)?.max(0) as u64;
        let project_count = occurrences
            .iter()
            .map(|o| o.project_id.as_str())
            .collect::<BTreeSet<_>>()
            .len() as i64;

        let (category, description, created_at) = match (&existing, meta) {
            (Some(current), Some(meta)) => (
                current.category.clone(),
                meta.description.to_string(),
                current.created_at,
            ),
            (Some(current), None) => (
                current.category.clone(),
                current.description.clone(),
                current.created_at,
            ),
            (None, Some(meta)) => (meta.category.to_string(), meta.description.to_string(), now),
            (None, None) => return Ok((Refresh::Absent, retries)),
        };

        let row = AggregationRow {
            signature: signature.to_string(),
            category,
            description,
            aggregated_confidence: weighted_confidence(&occurrences),
            consensus_score: consensus(exhibiting, active),
            occurrence_count: project_count,
            languages: to_json("aggregation languages", &merged_languages(&occurrences))?,
            revision: 1,
            created_at,
            updated_at: now,
        };

        match existing {
            None => {
                if aggregations::insert_aggregation(conn, &row)? {
                    return Ok((Refresh::Inserted, retries));
                }
            }
            Some(current) => {
                if aggregations::cas_update_aggregation(conn, &row, current.revision)? {
                    return Ok((Refresh::Updated, retries));
                }
                last_expected = current.revision;
            }
        }
        retries += 1;
    }

    let found = aggregations::get_aggregation(conn, signature)?.map_or(0, |row| row.revision);
    Err(StorageError::ConsistencyViolation {
        expected: last_expected.max(0) as u64,
        found: found.max(0) as u64,
    })
}

/// Recompute every consensus score against the current active project set.
/// Called whenever a project is linked or unlinked. Returns rows changed.
pub fn recompute_all_consensus(
    conn: &Connection,
    max_attempts: u32,
    now: i64,
) -> Result<usize, StorageError> {
    let active = projects::count_active_projects(conn)?.max(0) as u64;
    let mut changed = 0usize;

    for (signature, stored, revision) in aggregations::consensus_snapshot(conn)? {
        let mut expected = revision;
        let mut current = stored;
        let mut attempts = 0u32;
        loop {
            let exhibiting = aggregations::active_project_count_for(conn, &signature)?.max(0) as u64;
            let score = consensus(exhibiting, active);
            if (score - current).abs() < f64::EPSILON {
                break;
            }
            if aggregations::cas_update_consensus(conn, &signature, score, expected, now)? {
                changed += 1;
                break;
            }
            attempts += 1;
            let Some(row) = aggregations::get_aggregation(conn, &signature)? else {
                break;
            };
            if attempts >= max_attempts.max(1) {
                return Err(StorageError::ConsistencyViolation {
                    expected: expected.max(0) as u64,
                    found: row.revision.max(0) as u64,
                });
            }
            expected = row.revision;
            current = row.consensus_score;
        }
    }
    tracing::debug!(active_projects = active, changed, "consensus recomputed");
    Ok(changed)
}
