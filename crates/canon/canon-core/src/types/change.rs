//! Change events consumed by the incremental learner.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of change observed for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    /// Carries the previous path in `FileChange::previous_path`.
    Renamed,
}

impl ChangeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        }
    }

    /// Whether this change requires the file to be re-extracted.
    pub fn needs_extraction(&self) -> bool {
        matches!(self, Self::Added | Self::Modified)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What caused a batch of changes to be learned.
/// Ordered by scheduling priority: `Manual` > `GitCommit` > `Watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    Watch,
    GitCommit,
    Manual,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::GitCommit => "git-commit",
            Self::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "watch" => Some(Self::Watch),
            "git-commit" => Some(Self::GitCommit),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Scheduling priority; higher runs first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Manual => 3,
            Self::GitCommit => 2,
            Self::Watch => 1,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single file change event: `{path, change_kind, revision?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the project root.
    pub path: String,
    pub kind: ChangeKind,
    /// Required for `Renamed`, ignored otherwise.
    #[serde(default)]
    pub previous_path: Option<String>,
    /// Version-control revision the change belongs to, when known.
    #[serde(default)]
    pub revision: Option<String>,
}

impl FileChange {
    pub fn added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Added)
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(path, ChangeKind::Deleted)
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: to.into(),
            kind: ChangeKind::Renamed,
            previous_path: Some(from.into()),
            revision: None,
        }
    }

    fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            previous_path: None,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}
