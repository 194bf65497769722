//! Tests for the Canon configuration system.

use std::sync::Mutex;

use canon_core::config::{CanonConfig, CliOverrides};
use canon_core::errors::ConfigError;

/// Serializes tests that modify environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

/// Clear all CANON_ env vars and point HOME at an empty directory so the
/// developer's own user config never leaks into a test.
fn isolate_env(home: &std::path::Path) {
    for key in [
        "CANON_WORKER_THREADS",
        "CANON_DETECTION_HIGH_THRESHOLD",
        "CANON_DETECTION_MEDIUM_THRESHOLD",
        "CANON_LEARNING_MAX_FILE_SIZE",
        "CANON_LEARNING_RELEARN_THRESHOLD",
        "CANON_STORAGE_GLOBAL_DIR",
    ] {
        std::env::remove_var(key);
    }
    std::env::set_var("HOME", home);
}

#[test]
fn layered_resolution_prefers_cli_then_env_then_project() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    std::fs::write(
        dir.path().join("canon.toml"),
        r#"
[workers]
threads = 2

[learning]
max_file_size = 2_000_000
max_examples = 3
"#,
    )
    .unwrap();

    std::env::set_var("CANON_LEARNING_MAX_FILE_SIZE", "5000000");
    std::env::set_var("CANON_WORKER_THREADS", "6");

    let cli = CliOverrides {
        worker_threads: Some(12),
        ..Default::default()
    };
    let config = CanonConfig::load(dir.path(), Some(&cli)).unwrap();

    assert_eq!(config.workers.threads, Some(12));
    assert_eq!(config.learning.max_file_size, Some(5_000_000));
    assert_eq!(config.learning.max_examples, Some(3));

    isolate_env(home.path());
}

#[test]
fn user_config_is_lowest_file_layer() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let user_dir = home.path().join(".canon");
    std::fs::create_dir_all(&user_dir).unwrap();
    std::fs::write(
        user_dir.join("config.toml"),
        "[detection]\npenalty_low = 4\nhigh_threshold = 0.9\n",
    )
    .unwrap();

    let dir = tempdir();
    std::fs::write(dir.path().join("canon.toml"), "[detection]\nhigh_threshold = 0.95\n").unwrap();

    let config = CanonConfig::load(dir.path(), None).unwrap();
    assert_eq!(config.detection.effective_penalty_low(), 4);
    assert_eq!(config.detection.effective_high_threshold(), 0.95);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    let config = CanonConfig::load(dir.path(), None).unwrap();

    assert_eq!(config.learning.effective_max_examples(), 5);
    assert_eq!(config.learning.effective_max_file_size(), 1_048_576);
    assert_eq!(config.detection.effective_high_threshold(), 0.85);
    assert_eq!(config.detection.effective_medium_threshold(), 0.60);
    assert_eq!(config.detection.effective_penalty_high(), 15);
    assert_eq!(config.detection.effective_penalty_medium(), 7);
    assert_eq!(config.detection.effective_penalty_low(), 2);
    assert_eq!(config.workers.effective_threads(), 4);
    assert_eq!(config.aggregation.effective_top_languages(), 5);
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    std::fs::write(dir.path().join("canon.toml"), "this is not valid toml {{{{").unwrap();

    match CanonConfig::load(dir.path(), None).unwrap_err() {
        ConfigError::ParseError { .. } => {}
        other => panic!("Expected ParseError, got: {:?}", other),
    }
}

#[test]
fn out_of_range_threshold_fails_validation() {
    let err = CanonConfig::from_toml("[detection]\nhigh_threshold = 1.5\n").unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => {
            assert_eq!(field, "detection.high_threshold");
        }
        other => panic!("Expected ValidationFailed, got: {:?}", other),
    }
}

#[test]
fn medium_threshold_must_stay_below_high() {
    let err = CanonConfig::from_toml(
        "[detection]\nhigh_threshold = 0.5\nmedium_threshold = 0.7\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { .. }));
}

#[test]
fn full_recency_bonus_rejected() {
    let err = CanonConfig::from_toml("[learning]\nrecency_bonus = 1.0\n").unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => assert_eq!(field, "learning.recency_bonus"),
        other => panic!("Expected ValidationFailed, got: {:?}", other),
    }
    assert!(CanonConfig::from_toml("[learning]\nrecency_bonus = 0.99\n").is_ok());
}

#[test]
fn zero_worker_threads_rejected() {
    let err = CanonConfig::from_toml("[workers]\nthreads = 0\n").unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => assert_eq!(field, "workers.threads"),
        other => panic!("Expected ValidationFailed, got: {:?}", other),
    }
}

#[test]
fn unknown_keys_are_ignored() {
    let config = CanonConfig::from_toml("[learning]\nmax_examples = 2\nfuture_knob = true\n").unwrap();
    assert_eq!(config.learning.effective_max_examples(), 2);
}

#[test]
fn toml_round_trip_preserves_values() {
    let config = CanonConfig::from_toml(
        "[aggregation]\ncas_max_attempts = 3\n[storage]\nread_pool_size = 2\n",
    )
    .unwrap();
    let text = config.to_toml().unwrap();
    let back = CanonConfig::from_toml(&text).unwrap();
    assert_eq!(back.aggregation.effective_cas_max_attempts(), 3);
    assert_eq!(back.storage.effective_read_pool_size(), 2);
}
