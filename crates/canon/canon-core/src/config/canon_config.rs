//! Top-level Canon configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AggregationConfig, DetectionConfig, LearningConfig, StorageConfig, WorkerConfig};
use crate::constants;
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`CANON_*`)
/// 3. Project config (`canon.toml` in project root)
/// 4. User config (`~/.canon/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CanonConfig {
    pub learning: LearningConfig,
    pub detection: DetectionConfig,
    pub aggregation: AggregationConfig,
    pub workers: WorkerConfig,
    pub storage: StorageConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub worker_threads: Option<usize>,
    pub high_threshold: Option<f64>,
    pub medium_threshold: Option<f64>,
    pub max_file_size: Option<u64>,
}

impl CanonConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(constants::PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: CanonConfig = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &CanonConfig) -> Result<(), ConfigError> {
        let unit_fields = [
            ("detection.high_threshold", config.detection.high_threshold),
            ("detection.medium_threshold", config.detection.medium_threshold),
            ("learning.recency_bonus", config.learning.recency_bonus),
            ("learning.relearn_threshold", config.learning.relearn_threshold),
        ];
        for (field, value) in unit_fields {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: "must be between 0.0 and 1.0".to_string(),
                    });
                }
            }
        }
        // A single fresh observation must stay below full confidence.
        if config.learning.recency_bonus.is_some_and(|v| v >= 1.0) {
            return Err(ConfigError::ValidationFailed {
                field: "learning.recency_bonus".to_string(),
                message: "must be lower than 1.0".to_string(),
            });
        }
        if config.detection.effective_medium_threshold() >= config.detection.effective_high_threshold() {
            return Err(ConfigError::ValidationFailed {
                field: "detection.medium_threshold".to_string(),
                message: "must be lower than detection.high_threshold".to_string(),
            });
        }
        if config.workers.threads == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "workers.threads".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.workers.queue_capacity == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "workers.queue_capacity".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.learning.max_examples == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "learning.max_examples".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.learning.max_file_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "learning.max_file_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.aggregation.cas_max_attempts == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "aggregation.cas_max_attempts".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the user config path: `~/.canon/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        canon_home().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut CanonConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: CanonConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base` values
    /// only when `other` has a `Some` value.
    fn merge(base: &mut CanonConfig, other: &CanonConfig) {
        // Learning
        if other.learning.max_examples.is_some() {
            base.learning.max_examples = other.learning.max_examples;
        }
        if other.learning.recency_window_days.is_some() {
            base.learning.recency_window_days = other.learning.recency_window_days;
        }
        if other.learning.recency_bonus.is_some() {
            base.learning.recency_bonus = other.learning.recency_bonus;
        }
        if other.learning.relearn_threshold.is_some() {
            base.learning.relearn_threshold = other.learning.relearn_threshold;
        }
        if other.learning.max_file_size.is_some() {
            base.learning.max_file_size = other.learning.max_file_size;
        }
        if other.learning.parallel_extraction.is_some() {
            base.learning.parallel_extraction = other.learning.parallel_extraction;
        }

        // Detection
        if other.detection.high_threshold.is_some() {
            base.detection.high_threshold = other.detection.high_threshold;
        }
        if other.detection.medium_threshold.is_some() {
            base.detection.medium_threshold = other.detection.medium_threshold;
        }
        if other.detection.penalty_high.is_some() {
            base.detection.penalty_high = other.detection.penalty_high;
        }
        if other.detection.penalty_medium.is_some() {
            base.detection.penalty_medium = other.detection.penalty_medium;
        }
        if other.detection.penalty_low.is_some() {
            base.detection.penalty_low = other.detection.penalty_low;
        }
        if other.detection.glob_cache_capacity.is_some() {
            base.detection.glob_cache_capacity = other.detection.glob_cache_capacity;
        }

        // Aggregation
        if other.aggregation.cas_max_attempts.is_some() {
            base.aggregation.cas_max_attempts = other.aggregation.cas_max_attempts;
        }
        if other.aggregation.top_languages.is_some() {
            base.aggregation.top_languages = other.aggregation.top_languages;
        }
        if other.aggregation.default_limit.is_some() {
            base.aggregation.default_limit = other.aggregation.default_limit;
        }

        // Workers
        if other.workers.threads.is_some() {
            base.workers.threads = other.workers.threads;
        }
        if other.workers.queue_capacity.is_some() {
            base.workers.queue_capacity = other.workers.queue_capacity;
        }
        if other.workers.max_batch_files.is_some() {
            base.workers.max_batch_files = other.workers.max_batch_files;
        }

        // Storage
        if other.storage.read_pool_size.is_some() {
            base.storage.read_pool_size = other.storage.read_pool_size;
        }
        if other.storage.global_dir.is_some() {
            base.storage.global_dir = other.storage.global_dir.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `CANON_WORKER_THREADS`, `CANON_DETECTION_HIGH_THRESHOLD`, etc.
    fn apply_env_overrides(config: &mut CanonConfig) {
        if let Ok(val) = std::env::var("CANON_WORKER_THREADS") {
            if let Ok(v) = val.parse::<usize>() {
                config.workers.threads = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CANON_DETECTION_HIGH_THRESHOLD") {
            if let Ok(v) = val.parse::<f64>() {
                config.detection.high_threshold = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CANON_DETECTION_MEDIUM_THRESHOLD") {
            if let Ok(v) = val.parse::<f64>() {
                config.detection.medium_threshold = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CANON_LEARNING_MAX_FILE_SIZE") {
            if let Ok(v) = val.parse::<u64>() {
                config.learning.max_file_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CANON_LEARNING_RELEARN_THRESHOLD") {
            if let Ok(v) = val.parse::<f64>() {
                config.learning.relearn_threshold = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CANON_STORAGE_GLOBAL_DIR") {
            config.storage.global_dir = Some(val);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut CanonConfig, cli: &CliOverrides) {
        if let Some(v) = cli.worker_threads {
            config.workers.threads = Some(v);
        }
        if let Some(v) = cli.high_threshold {
            config.detection.high_threshold = Some(v);
        }
        if let Some(v) = cli.medium_threshold {
            config.detection.medium_threshold = Some(v);
        }
        if let Some(v) = cli.max_file_size {
            config.learning.max_file_size = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }

    /// Directory holding the global database: the configured directory, or `~/.canon/`.
    pub fn global_dir(&self) -> Option<PathBuf> {
        match &self.storage.global_dir {
            Some(dir) => Some(PathBuf::from(dir)),
            None => canon_home(),
        }
    }
}

/// Returns the user-level canon directory: `~/.canon/`.
fn canon_home() -> Option<PathBuf> {
    home_dir().map(|h| h.join(constants::DATA_DIR_NAME))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
