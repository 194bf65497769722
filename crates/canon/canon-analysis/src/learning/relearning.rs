//! Relearning decision: when more than `threshold` of the tracked files
//! change in one batch, every pattern's derived fields are refreshed.

use serde::{Deserialize, Serialize};

/// Check if a full refresh should be triggered.
///
/// `changed_files`: files in the batch.
/// `total_files`: files tracked by the store before the batch.
/// `threshold`: change ratio threshold (default 0.10 = 10%).
pub fn should_relearn(changed_files: u64, total_files: u64, threshold: f64) -> bool {
    if total_files == 0 {
        return false;
    }
    let change_ratio = changed_files as f64 / total_files as f64;
    change_ratio > threshold
}

/// How a batch was learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    /// Every stored pattern is recomputed from its evidence.
    Full,
    /// Only patterns touched by the batch are recomputed.
    Incremental,
    /// Nothing to learn.
    Skip,
}

impl LearningMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Skip => "skip",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Self::Full),
            "incremental" => Some(Self::Incremental),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Determine the appropriate learning mode.
pub fn determine_mode(changed_files: u64, total_files: u64, threshold: f64) -> LearningMode {
    if changed_files == 0 {
        return LearningMode::Skip;
    }
    if should_relearn(changed_files, total_files, threshold) {
        LearningMode::Full
    } else {
        LearningMode::Incremental
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_changes() {
        assert!(!should_relearn(0, 100, 0.10));
        assert_eq!(determine_mode(0, 100, 0.10), LearningMode::Skip);
    }

    #[test]
    fn test_below_threshold() {
        assert!(!should_relearn(5, 100, 0.10));
        assert_eq!(determine_mode(5, 100, 0.10), LearningMode::Incremental);
    }

    #[test]
    fn test_above_threshold() {
        assert!(should_relearn(15, 100, 0.10));
        assert_eq!(determine_mode(15, 100, 0.10), LearningMode::Full);
    }

    #[test]
    fn test_fresh_store_is_incremental() {
        assert!(!should_relearn(5, 0, 0.10));
        assert_eq!(determine_mode(5, 0, 0.10), LearningMode::Incremental);
    }

    #[test]
    fn test_mode_names_round_trip() {
        for mode in [LearningMode::Full, LearningMode::Incremental, LearningMode::Skip] {
            assert_eq!(LearningMode::from_name(mode.name()), Some(mode));
        }
    }
}
