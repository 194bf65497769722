//! Frequency/recency confidence heuristic.
//!
//! Base: `min(1, 0.5 + 0.05 * log2(frequency + 1))`.
//! Recency: when `last_seen` falls inside the recent window, a bonus of
//! `bonus * (1 - base)` is added, so the result stays within [0, 1].
//! Corroboration never lowers stored confidence; only evidence removal does.

use canon_core::config::LearningConfig;

/// Confidence policy derived from the learning configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub recency_window_secs: i64,
    pub recency_bonus: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::from_config(&LearningConfig::default())
    }
}

impl ConfidencePolicy {
    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            recency_window_secs: config.effective_recency_window_secs(),
            recency_bonus: config.effective_recency_bonus(),
        }
    }

    /// Frequency-only confidence.
    pub fn base(frequency: u64) -> f64 {
        let raw = 0.5 + 0.05 * ((frequency as f64) + 1.0).log2();
        if !raw.is_finite() {
            return 0.5;
        }
        raw.clamp(0.0, 1.0)
    }

    /// Confidence for a pattern seen `frequency` times, last at `last_seen`.
    pub fn score(&self, frequency: u64, last_seen: i64, now: i64) -> f64 {
        let base = Self::base(frequency);
        let age = now.saturating_sub(last_seen);
        let bonus = if age >= 0 && age <= self.recency_window_secs {
            self.recency_bonus * (1.0 - base)
        } else {
            0.0
        };
        (base + bonus).clamp(0.0, 1.0)
    }

    /// Stored confidence after corroboration: never lower than before.
    pub fn corroborate(previous: f64, computed: f64) -> f64 {
        previous.max(computed).clamp(0.0, 1.0)
    }
}
