//! Subsystem error → `ApiError` conversion.
//!
//! Every Canon error enum converts to an `ApiError` carrying its stable code.
//! `Display` keeps the boundary format: `[ERROR_CODE] Human-readable message`.

use canon_core::errors::error_code::{self, CanonErrorCode};
use canon_core::errors::{
    CanonError, ConfigError, DetectionError, LearnError, RegistryError, StorageError, SyncError,
};
use serde::Serialize;

/// The only error type an exposed operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    /// The same call may succeed if retried unchanged.
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(error_code::INVALID_INPUT, message)
    }

    pub fn unknown_project(project_id: &str) -> Self {
        Self::new(error_code::UNKNOWN_PROJECT, format!("Unknown project: {project_id}"))
    }

    pub fn inactive_project(project_id: &str) -> Self {
        Self::new(
            error_code::PROJECT_INACTIVE,
            format!("Project {project_id} is not active"),
        )
    }
}

impl CanonErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        self.code
    }
}

impl From<CanonError> for ApiError {
    fn from(e: CanonError) -> Self {
        Self {
            code: e.error_code(),
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}

/// Keeps the subsystem's own message, without the aggregate's prefix.
fn from_subsystem<E>(e: E) -> ApiError
where
    E: CanonErrorCode + std::fmt::Display + Into<CanonError>,
{
    let code = e.error_code();
    let message = e.to_string();
    let retryable = e.into().is_retryable();
    ApiError {
        code,
        message,
        retryable,
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        from_subsystem(e)
    }
}

impl From<LearnError> for ApiError {
    fn from(e: LearnError) -> Self {
        from_subsystem(e)
    }
}

impl From<DetectionError> for ApiError {
    fn from(e: DetectionError) -> Self {
        from_subsystem(e)
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        from_subsystem(e)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        from_subsystem(e)
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        from_subsystem(e)
    }
}
