//! Learner inputs and outputs: change batches, origin context, learning deltas.

use canon_core::errors::StorageError;
use canon_core::traits::{Cancellable, CancellationToken};
use canon_core::types::{FileChange, Trigger};
use canon_storage::queries::deltas::DeltaRow;
use serde::{Deserialize, Serialize};

use super::relearning::LearningMode;
use crate::patterns::types::{from_json, to_json};
use crate::patterns::PatternContent;

/// One batch of file changes handed to `process_changes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub changes: Vec<FileChange>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<FileChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Where a batch came from and how it may be interrupted.
#[derive(Debug, Clone)]
pub struct OriginContext {
    pub trigger: Trigger,
    pub revision: Option<String>,
    /// Checked once before the merge starts; a started merge always completes.
    pub cancel: Option<CancellationToken>,
}

impl OriginContext {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            revision: None,
            cancel: None,
        }
    }

    pub fn manual() -> Self {
        Self::new(Trigger::Manual)
    }

    pub fn watch() -> Self {
        Self::new(Trigger::Watch)
    }

    pub fn git_commit(revision: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::GitCommit,
            revision: Some(revision.into()),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

impl Default for OriginContext {
    fn default() -> Self {
        Self::manual()
    }
}

/// Immutable record of one merge into a pattern store.
///
/// A delta whose `resulting_version` equals its `preceding_version` changed
/// nothing and was not logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningDelta {
    pub id: String,
    pub trigger: Trigger,
    pub mode: LearningMode,
    pub revision: Option<String>,
    pub files_touched: u32,
    pub concepts_added: u32,
    pub concepts_modified: u32,
    pub concepts_removed: u32,
    pub patterns_added: u32,
    pub patterns_modified: u32,
    pub patterns_removed: u32,
    pub duration_ms: u64,
    pub applied_at: i64,
    pub preceding_version: u64,
    pub resulting_version: u64,
    pub partial_degradation: bool,
    pub degraded_files: Vec<String>,
}

impl LearningDelta {
    /// True when the merge left the store unchanged.
    pub fn is_noop(&self) -> bool {
        self.resulting_version == self.preceding_version
    }

    pub fn to_row(&self) -> Result<DeltaRow, StorageError> {
        Ok(DeltaRow {
            id: self.id.clone(),
            trigger: self.trigger.name().to_string(),
            mode: self.mode.name().to_string(),
            revision: self.revision.clone(),
            files_touched: i64::from(self.files_touched),
            concepts_added: i64::from(self.concepts_added),
            concepts_modified: i64::from(self.concepts_modified),
            concepts_removed: i64::from(self.concepts_removed),
            patterns_added: i64::from(self.patterns_added),
            patterns_modified: i64::from(self.patterns_modified),
            patterns_removed: i64::from(self.patterns_removed),
            duration_ms: self.duration_ms as i64,
            applied_at: self.applied_at,
            preceding_version: self.preceding_version as i64,
            resulting_version: self.resulting_version as i64,
            partial_degradation: self.partial_degradation,
            degraded_files: to_json("degraded files", &self.degraded_files)?,
        })
    }

    pub fn from_row(row: &DeltaRow) -> Result<Self, StorageError> {
        let trigger = Trigger::from_name(&row.trigger).ok_or_else(|| StorageError::Serialization {
            entity: "delta trigger".to_string(),
            message: format!("unknown trigger '{}'", row.trigger),
        })?;
        let mode = LearningMode::from_name(&row.mode).ok_or_else(|| StorageError::Serialization {
            entity: "delta mode".to_string(),
            message: format!("unknown mode '{}'", row.mode),
        })?;
        Ok(Self {
            id: row.id.clone(),
            trigger,
            mode,
            revision: row.revision.clone(),
            files_touched: clamp_u32(row.files_touched),
            concepts_added: clamp_u32(row.concepts_added),
            concepts_modified: clamp_u32(row.concepts_modified),
            concepts_removed: clamp_u32(row.concepts_removed),
            patterns_added: clamp_u32(row.patterns_added),
            patterns_modified: clamp_u32(row.patterns_modified),
            patterns_removed: clamp_u32(row.patterns_removed),
            duration_ms: row.duration_ms.max(0) as u64,
            applied_at: row.applied_at,
            preceding_version: row.preceding_version.max(0) as u64,
            resulting_version: row.resulting_version.max(0) as u64,
            partial_degradation: row.partial_degradation,
            degraded_files: from_json("degraded files", &row.degraded_files)?,
        })
    }
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// A pattern imported from outside the evidence table (another tool, a
/// previous installation). Its frequency becomes the pattern's baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSeed {
    pub content: PatternContent,
    pub frequency: u64,
    pub confidence: f64,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_row_round_trip() {
        let delta = LearningDelta {
            id: "d1".to_string(),
            trigger: Trigger::GitCommit,
            mode: LearningMode::Incremental,
            revision: Some("abc123".to_string()),
            files_touched: 3,
            concepts_added: 4,
            concepts_modified: 1,
            concepts_removed: 2,
            patterns_added: 1,
            patterns_modified: 2,
            patterns_removed: 0,
            duration_ms: 12,
            applied_at: 1_700_000_000,
            preceding_version: 4,
            resulting_version: 5,
            partial_degradation: true,
            degraded_files: vec!["legacy/old.x".to_string()],
        };
        let row = delta.to_row().unwrap();
        assert_eq!(row.trigger, "git-commit");
        assert_eq!(row.degraded_files, r#"["legacy/old.x"]"#);
        assert_eq!(LearningDelta::from_row(&row).unwrap(), delta);
        assert!(!delta.is_noop());
    }

    #[test]
    fn cancellation_is_read_from_token() {
        let token = CancellationToken::new();
        let origin = OriginContext::watch().with_cancel(token.clone());
        assert!(!origin.is_cancelled());
        token.cancel();
        assert!(origin.is_cancelled());
    }
}
