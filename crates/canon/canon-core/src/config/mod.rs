//! Configuration system for Canon.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod aggregation_config;
pub mod canon_config;
pub mod detection_config;
pub mod learning_config;
pub mod storage_config;
pub mod worker_config;

pub use aggregation_config::AggregationConfig;
pub use canon_config::{CanonConfig, CliOverrides};
pub use detection_config::DetectionConfig;
pub use learning_config::LearningConfig;
pub use storage_config::StorageConfig;
pub use worker_config::WorkerConfig;
