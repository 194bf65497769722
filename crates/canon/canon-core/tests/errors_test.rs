//! Tests for the Canon error handling system.

use canon_core::errors::error_code;
use canon_core::errors::*;

#[test]
fn every_error_has_a_code() {
    let errors: Vec<(Box<dyn std::fmt::Display>, &'static str)> = vec![
        (Box::new(StorageError::DbBusy), StorageError::DbBusy.error_code()),
        (
            Box::new(LearnError::InvalidBatch {
                reason: "empty path".into(),
            }),
            LearnError::InvalidBatch {
                reason: "empty path".into(),
            }
            .error_code(),
        ),
        (
            Box::new(SyncError::InProgress {
                project_id: "p".into(),
            }),
            SyncError::InProgress {
                project_id: "p".into(),
            }
            .error_code(),
        ),
    ];
    for (err, code) in errors {
        assert!(!code.is_empty(), "empty code for {err}");
    }
}

#[test]
fn api_string_has_code_prefix() {
    let err = DetectionError::InvalidGlob {
        glob: "[".into(),
        message: "unclosed class".into(),
    };
    let s = err.api_string();
    assert!(s.starts_with("[INVALID_GLOB] "), "got {s}");
    assert!(s.contains("unclosed class"));
}

#[test]
fn storage_codes_are_specific() {
    assert_eq!(StorageError::DbBusy.error_code(), error_code::DB_BUSY);
    assert_eq!(StorageError::DiskFull.error_code(), error_code::DISK_FULL);
    assert_eq!(
        StorageError::ConsistencyViolation {
            expected: 3,
            found: 4
        }
        .error_code(),
        error_code::CONSISTENCY_VIOLATION
    );
    assert_eq!(
        StorageError::SqliteError {
            message: "x".into()
        }
        .error_code(),
        error_code::STORAGE_ERROR
    );
}

#[test]
fn sqlite_messages_are_classified() {
    assert!(matches!(
        StorageError::from_sqlite_message("database is locked"),
        StorageError::DbBusy
    ));
    assert!(matches!(
        StorageError::from_sqlite_message("database or disk is full"),
        StorageError::DiskFull
    ));
    assert!(matches!(
        StorageError::from_sqlite_message("database disk image is malformed"),
        StorageError::DbCorrupt { .. }
    ));
    assert!(matches!(
        StorageError::from_sqlite_message("no such table: x"),
        StorageError::SqliteError { .. }
    ));
}

#[test]
fn consistency_violation_inside_merge_keeps_its_code() {
    let err = LearnError::MergeFailed {
        preceding_version: 4,
        source: StorageError::ConsistencyViolation {
            expected: 4,
            found: 5,
        },
    };
    assert_eq!(err.error_code(), error_code::CONSISTENCY_VIOLATION);

    let err = LearnError::MergeFailed {
        preceding_version: 4,
        source: StorageError::SqliteError {
            message: "constraint".into(),
        },
    };
    assert_eq!(err.error_code(), error_code::MERGE_FAILED);
}

#[test]
fn canon_error_propagates_codes_and_retryability() {
    let err: CanonError = SyncError::InProgress {
        project_id: "p1".into(),
    }
    .into();
    assert_eq!(err.error_code(), error_code::SYNC_IN_PROGRESS);
    assert!(err.is_retryable());

    let err: CanonError = SyncError::Interrupted {
        project_id: "p1".into(),
        checkpoint: 3,
        source: StorageError::DbBusy,
    }
    .into();
    assert!(err.is_retryable());

    let err: CanonError = RegistryError::UnknownProject {
        project_id: "nope".into(),
    }
    .into();
    assert_eq!(err.error_code(), error_code::UNKNOWN_PROJECT);
    assert!(!err.is_retryable());

    let err: CanonError = LearnError::InvalidBatch {
        reason: "renamed without previous path".into(),
    }
    .into();
    assert_eq!(err.error_code(), error_code::INVALID_INPUT);
    assert!(!err.is_retryable());
}

#[test]
fn extraction_unavailable_is_distinct() {
    let err = ExtractionError::Unavailable {
        collaborator: "parser".into(),
        message: "offline".into(),
    };
    assert_eq!(err.error_code(), error_code::COLLABORATOR_UNAVAILABLE);
    let err = ExtractionError::ExtractionFailed {
        path: "a.ts".into(),
        message: "bad".into(),
    };
    assert_eq!(err.error_code(), error_code::EXTRACTION_ERROR);
}
