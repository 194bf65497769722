//! Conflict detection configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Severity thresholds and score penalties for compliance checks.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DetectionConfig {
    /// Confidence at or above which violations are high severity. Default: 0.85.
    pub high_threshold: Option<f64>,
    /// Confidence at or above which violations are medium severity. Default: 0.60.
    pub medium_threshold: Option<f64>,
    pub penalty_high: Option<u32>,
    pub penalty_medium: Option<u32>,
    pub penalty_low: Option<u32>,
    /// Compiled exception globs kept in memory. Default: 1024.
    pub glob_cache_capacity: Option<u64>,
}

impl DetectionConfig {
    pub fn effective_high_threshold(&self) -> f64 {
        self.high_threshold
            .unwrap_or(constants::DEFAULT_HIGH_THRESHOLD)
    }

    pub fn effective_medium_threshold(&self) -> f64 {
        self.medium_threshold
            .unwrap_or(constants::DEFAULT_MEDIUM_THRESHOLD)
    }

    pub fn effective_penalty_high(&self) -> u32 {
        self.penalty_high.unwrap_or(constants::DEFAULT_PENALTY_HIGH)
    }

    pub fn effective_penalty_medium(&self) -> u32 {
        self.penalty_medium
            .unwrap_or(constants::DEFAULT_PENALTY_MEDIUM)
    }

    pub fn effective_penalty_low(&self) -> u32 {
        self.penalty_low.unwrap_or(constants::DEFAULT_PENALTY_LOW)
    }

    pub fn effective_glob_cache_capacity(&self) -> u64 {
        self.glob_cache_capacity
            .unwrap_or(constants::DEFAULT_GLOB_CACHE_CAPACITY)
    }
}
