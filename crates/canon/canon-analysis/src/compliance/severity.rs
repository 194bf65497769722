//! Severity thresholds and score penalties.

use canon_core::config::DetectionConfig;

use super::types::{Severity, Violation};

/// Maps pattern confidence to severity and severity to score penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityPolicy {
    pub high_threshold: f64,
    pub medium_threshold: f64,
    pub penalty_high: u32,
    pub penalty_medium: u32,
    pub penalty_low: u32,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl SeverityPolicy {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            high_threshold: config.effective_high_threshold(),
            medium_threshold: config.effective_medium_threshold(),
            penalty_high: config.effective_penalty_high(),
            penalty_medium: config.effective_penalty_medium(),
            penalty_low: config.effective_penalty_low(),
        }
    }

    pub fn classify(&self, confidence: f64) -> Severity {
        if confidence >= self.high_threshold {
            Severity::High
        } else if confidence >= self.medium_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn penalty(&self, severity: Severity) -> u32 {
        match severity {
            Severity::High => self.penalty_high,
            Severity::Medium => self.penalty_medium,
            Severity::Low => self.penalty_low,
        }
    }

    /// `max(0, 100 - Σ penalty)` over the reported violations.
    pub fn overall_score(&self, violations: &[Violation]) -> u32 {
        let penalty: u32 = violations
            .iter()
            .map(|v| self.penalty(v.severity))
            .fold(0u32, u32::saturating_add);
        100u32.saturating_sub(penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity) -> Violation {
        Violation {
            pattern_id: "p".into(),
            file_path: "src/a.ts".into(),
            line_start: 1,
            line_end: 1,
            severity,
            confidence: 0.9,
            message: String::new(),
            suggested_fix: None,
        }
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.classify(0.85), Severity::High);
        assert_eq!(policy.classify(0.849), Severity::Medium);
        assert_eq!(policy.classify(0.6), Severity::Medium);
        assert_eq!(policy.classify(0.59), Severity::Low);
    }

    #[test]
    fn configured_thresholds_apply() {
        let config = DetectionConfig {
            high_threshold: Some(0.95),
            medium_threshold: Some(0.9),
            ..Default::default()
        };
        let policy = SeverityPolicy::from_config(&config);
        assert_eq!(policy.classify(0.92), Severity::Medium);
        assert_eq!(policy.classify(0.88), Severity::Low);
    }

    #[test]
    fn score_subtracts_weighted_penalties() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.overall_score(&[]), 100);
        assert_eq!(policy.overall_score(&[violation(Severity::High)]), 85);
        let mixed = [
            violation(Severity::High),
            violation(Severity::Medium),
            violation(Severity::Low),
        ];
        assert_eq!(policy.overall_score(&mixed), 76);
    }

    #[test]
    fn score_floors_at_zero() {
        let policy = SeverityPolicy::default();
        let many: Vec<_> = (0..10).map(|_| violation(Severity::High)).collect();
        assert_eq!(policy.overall_score(&many), 0);
    }
}
