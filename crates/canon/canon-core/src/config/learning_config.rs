//! Incremental learning configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Configuration for the incremental learner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LearningConfig {
    /// Maximum example snippets kept per pattern. Default: 5.
    pub max_examples: Option<usize>,
    /// Days within which `last_seen` earns the recency bonus. Default: 7.
    pub recency_window_days: Option<u32>,
    /// Recency bonus as a fraction of the distance to 1.0. Default: 0.05.
    pub recency_bonus: Option<f64>,
    /// Fraction of tracked files changed that triggers a full re-learn. Default: 0.10.
    pub relearn_threshold: Option<f64>,
    /// Files larger than this are skipped and flagged degraded. Default: 1MB.
    pub max_file_size: Option<u64>,
    /// Extract changed files in parallel. Default: true.
    pub parallel_extraction: Option<bool>,
}

impl LearningConfig {
    pub fn effective_max_examples(&self) -> usize {
        self.max_examples.unwrap_or(constants::DEFAULT_MAX_EXAMPLES)
    }

    pub fn effective_recency_window_secs(&self) -> i64 {
        i64::from(
            self.recency_window_days
                .unwrap_or(constants::DEFAULT_RECENCY_WINDOW_DAYS),
        ) * 86_400
    }

    pub fn effective_recency_bonus(&self) -> f64 {
        self.recency_bonus.unwrap_or(constants::DEFAULT_RECENCY_BONUS)
    }

    pub fn effective_relearn_threshold(&self) -> f64 {
        self.relearn_threshold
            .unwrap_or(constants::DEFAULT_RELEARN_THRESHOLD)
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(constants::DEFAULT_MAX_FILE_SIZE)
    }

    pub fn effective_parallel_extraction(&self) -> bool {
        self.parallel_extraction.unwrap_or(true)
    }
}
