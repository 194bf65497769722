//! Storage errors.

use super::error_code::{self, CanonErrorCode};

/// Errors raised by the SQLite persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Database busy (another operation in progress)")]
    DbBusy,

    #[error("Database corrupt: {details}")]
    DbCorrupt { details: String },

    #[error("Disk full")]
    DiskFull,

    #[error("Migration to version {version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    /// A merge tried to write a store version that does not directly follow
    /// the one it read. Never reconciled automatically.
    #[error("Store version conflict: expected {expected}, found {found}")]
    ConsistencyViolation { expected: u64, found: u64 },

    #[error("Serialization failed for {entity}: {message}")]
    Serialization { entity: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl StorageError {
    /// Classify a raw SQLite failure message into the closest variant.
    pub fn from_sqlite_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("database is locked") || lower.contains("database is busy") {
            Self::DbBusy
        } else if lower.contains("database or disk is full") {
            Self::DiskFull
        } else if lower.contains("malformed") || lower.contains("not a database") {
            Self::DbCorrupt { details: message }
        } else {
            Self::SqliteError { message }
        }
    }
}

impl CanonErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DbBusy => error_code::DB_BUSY,
            Self::DbCorrupt { .. } => error_code::DB_CORRUPT,
            Self::DiskFull => error_code::DISK_FULL,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::ConsistencyViolation { .. } => error_code::CONSISTENCY_VIOLATION,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
