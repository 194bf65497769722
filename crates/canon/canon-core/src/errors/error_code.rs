//! CanonErrorCode trait for the operation boundary.

/// Trait for converting Canon errors to stable error code strings.
/// Every error enum must implement this so callers of the exposed
/// operations can branch on the kind of failure without parsing messages.
pub trait CanonErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted boundary error string: `[ERROR_CODE] message`.
    fn api_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Error code constants for the operation boundary.
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const DISK_FULL: &str = "DISK_FULL";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const CONSISTENCY_VIOLATION: &str = "CONSISTENCY_VIOLATION";
pub const EXTRACTION_ERROR: &str = "EXTRACTION_ERROR";
pub const COLLABORATOR_UNAVAILABLE: &str = "COLLABORATOR_UNAVAILABLE";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const INVALID_GLOB: &str = "INVALID_GLOB";
pub const MERGE_FAILED: &str = "MERGE_FAILED";
pub const DETECTION_ERROR: &str = "DETECTION_ERROR";
pub const UNKNOWN_PROJECT: &str = "UNKNOWN_PROJECT";
pub const PROJECT_INACTIVE: &str = "PROJECT_INACTIVE";
pub const SYNC_IN_PROGRESS: &str = "SYNC_IN_PROGRESS";
pub const SYNC_FAILED: &str = "SYNC_FAILED";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CANCELLED: &str = "CANCELLED";
