//! Aggregation types.

use canon_core::errors::StorageError;
use canon_storage::queries::aggregations::{AggregationRow, OccurrenceRow};
use serde::{Deserialize, Serialize};

use crate::patterns::types::from_json;

/// One project's contribution to an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub project_id: String,
    pub pattern_id: String,
    pub frequency: u64,
    pub confidence: f64,
    pub languages: Vec<String>,
}

impl Occurrence {
    pub fn from_row(row: &OccurrenceRow) -> Result<Self, StorageError> {
        Ok(Self {
            project_id: row.project_id.clone(),
            pattern_id: row.pattern_id.clone(),
            frequency: row.frequency.max(0) as u64,
            confidence: row.confidence,
            languages: from_json("occurrence languages", &row.languages)?,
        })
    }
}

/// A pattern signature seen across projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAggregation {
    pub signature: String,
    pub category: String,
    pub description: String,
    pub occurrences: Vec<Occurrence>,
    /// Frequency-weighted mean confidence over the occurrences.
    pub aggregated_confidence: f64,
    /// Fraction of active projects exhibiting the signature.
    pub consensus_score: f64,
    /// Distinct projects with an occurrence.
    pub project_count: u64,
    pub languages: Vec<String>,
    pub revision: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PatternAggregation {
    pub fn from_rows(row: &AggregationRow, occurrences: &[OccurrenceRow]) -> Result<Self, StorageError> {
        Ok(Self {
            signature: row.signature.clone(),
            category: row.category.clone(),
            description: row.description.clone(),
            occurrences: occurrences
                .iter()
                .map(Occurrence::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            aggregated_confidence: row.aggregated_confidence,
            consensus_score: row.consensus_score,
            project_count: row.occurrence_count.max(0) as u64,
            languages: from_json("aggregation languages", &row.languages)?,
            revision: row.revision.max(0) as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Filter for `get_aggregations`. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationFilter {
    pub category: Option<String>,
    pub min_project_count: Option<u64>,
    pub min_consensus: Option<f64>,
    pub language: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every change up to the project's current version was merged.
    Complete,
    /// The checkpoint already matched the store; nothing to merge.
    UpToDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub project_id: String,
    pub patterns_added: u32,
    pub patterns_updated: u32,
    pub patterns_removed: u32,
    /// Concepts gained since the previous sync.
    pub concepts_added: u64,
    pub status: SyncStatus,
    /// The project's `last_synced_version` after the sync.
    pub checkpoint: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub language: String,
    pub projects: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioView {
    pub total_projects: u64,
    pub total_patterns: u64,
    pub total_concepts: u64,
    pub total_aggregations: u64,
    pub top_languages: Vec<LanguageShare>,
}
