//! Registered project records.

use canon_core::errors::StorageError;
use canon_storage::queries::projects::ProjectRow;
use serde::{Deserialize, Serialize};

use crate::patterns::types::from_json;

/// Caller-supplied metadata for `link_project`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    /// Display name. Defaults to the last path component.
    pub name: Option<String>,
    pub primary_language: Option<String>,
    pub frameworks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub path: String,
    pub name: String,
    pub primary_language: Option<String>,
    pub frameworks: Vec<String>,
    pub linked_at: i64,
    pub unlinked_at: Option<i64>,
    /// Checkpoint: the last store version merged into the aggregations.
    pub last_synced_version: u64,
    pub last_synced_at: Option<i64>,
    pub pattern_count: u64,
    pub concept_count: u64,
    pub is_active: bool,
}

impl Project {
    pub fn from_row(row: &ProjectRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: row.id.clone(),
            path: row.path.clone(),
            name: row.name.clone(),
            primary_language: row.primary_language.clone(),
            frameworks: from_json("project frameworks", &row.frameworks)?,
            linked_at: row.linked_at,
            unlinked_at: row.unlinked_at,
            last_synced_version: row.last_synced_version.max(0) as u64,
            last_synced_at: row.last_synced_at,
            pattern_count: row.pattern_count.max(0) as u64,
            concept_count: row.concept_count.max(0) as u64,
            is_active: row.is_active,
        })
    }
}

/// Result of `link_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub project: Project,
    /// The path was already registered; id and checkpoint were kept.
    pub relinked: bool,
}
