//! Compliance report types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Violation severity, derived from the confidence of the violated pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a suggested fix would be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStrategy {
    /// Rename an identifier.
    Rename,
    /// Rename the file itself.
    RenameFile,
}

impl fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::RenameFile => write!(f, "rename_file"),
        }
    }
}

/// Advisory rewrite attached to a violation. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub strategy: FixStrategy,
    pub description: String,
    /// The replacement text, if applicable.
    pub replacement: Option<String>,
}

/// One deviation from a stored pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub pattern_id: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    pub severity: Severity,
    /// Confidence of the violated pattern at check time.
    pub confidence: f64,
    pub message: String,
    pub suggested_fix: Option<SuggestedFix>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceOptions {
    /// Lowest severity reported.
    pub severity_threshold: Severity,
    pub auto_fix: bool,
    /// Persist reported violations to the store's violation history.
    pub track_history: bool,
}

impl Default for ComplianceOptions {
    fn default() -> Self {
        Self {
            severity_threshold: Severity::Low,
            auto_fix: false,
            track_history: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub file_path: String,
    /// Ordered by line, then pattern id.
    pub violations: Vec<Violation>,
    /// `max(0, 100 - sum of penalties)`.
    pub overall_score: u32,
    /// Extraction failed or the file type is unsupported; only text-level
    /// observations were checked.
    pub degraded: bool,
    /// Conflicts dropped because an exception covers them.
    pub suppressed: u32,
}

impl ComplianceReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }
}

/// An exception silencing one pattern inside a path scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternException {
    pub id: i64,
    pub pattern_id: String,
    pub scope_glob: String,
    pub reason: String,
    pub created_at: i64,
}

/// A violation as stored in the history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub violation: Violation,
    pub checked_at: i64,
}
