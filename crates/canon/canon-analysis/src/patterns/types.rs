//! The stored pattern and its conversion to and from storage rows.

use std::fmt;

use canon_core::errors::StorageError;
use canon_storage::queries::patterns::PatternRow;
use serde::{Deserialize, Serialize};

use super::content::PatternContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Naming,
    Structural,
    Implementation,
    Style,
    Testing,
}

impl PatternType {
    pub const ALL: [PatternType; 5] = [
        Self::Naming,
        Self::Structural,
        Self::Implementation,
        Self::Style,
        Self::Testing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Structural => "structural",
            Self::Implementation => "implementation",
            Self::Style => "style",
            Self::Testing => "testing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One bounded occurrence snippet kept on the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExample {
    pub file_path: String,
    pub line: u32,
    pub snippet: String,
}

/// A learned pattern.
///
/// `frequency` is `baseline` plus the number of evidence rows in the store.
/// The baseline carries frequency imported from outside the evidence table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_id: String,
    pub pattern_type: PatternType,
    pub content: PatternContent,
    pub frequency: u64,
    #[serde(default)]
    pub baseline: u64,
    pub confidence: f64,
    /// Parent directories and `lang:<name>` tags where the pattern was observed.
    pub contexts: Vec<String>,
    pub examples: Vec<PatternExample>,
    /// Store version of the merge that last changed this pattern.
    pub version: u64,
    pub created_at: i64,
    pub last_seen: i64,
}

impl Pattern {
    pub fn slot(&self) -> String {
        self.content.slot()
    }

    /// Language tags from `contexts`, without the `lang:` prefix.
    pub fn languages(&self) -> Vec<String> {
        self.contexts
            .iter()
            .filter_map(|c| c.strip_prefix("lang:"))
            .map(str::to_string)
            .collect()
    }

    pub fn to_row(&self) -> Result<PatternRow, StorageError> {
        Ok(PatternRow {
            pattern_id: self.pattern_id.clone(),
            pattern_type: self.pattern_type.name().to_string(),
            slot: self.slot(),
            content: to_json("pattern content", &self.content)?,
            frequency: self.frequency as i64,
            baseline: self.baseline as i64,
            confidence: self.confidence,
            contexts: to_json("pattern contexts", &self.contexts)?,
            examples: to_json("pattern examples", &self.examples)?,
            version: self.version as i64,
            created_at: self.created_at,
            last_seen: self.last_seen,
        })
    }

    pub fn from_row(row: &PatternRow) -> Result<Self, StorageError> {
        let content: PatternContent = from_json("pattern content", &row.content)?;
        Ok(Self {
            pattern_id: row.pattern_id.clone(),
            pattern_type: content.pattern_type(),
            content,
            frequency: row.frequency.max(0) as u64,
            baseline: row.baseline.max(0) as u64,
            confidence: row.confidence,
            contexts: from_json("pattern contexts", &row.contexts)?,
            examples: from_json("pattern examples", &row.examples)?,
            version: row.version.max(0) as u64,
            created_at: row.created_at,
            last_seen: row.last_seen,
        })
    }
}

pub(crate) fn to_json<T: Serialize + ?Sized>(entity: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        entity: entity.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(entity: &str, json: &str) -> Result<T, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Serialization {
        entity: entity.to_string(),
        message: e.to_string(),
    })
}
