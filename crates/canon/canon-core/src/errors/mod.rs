//! Error handling for Canon.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod canon_error;
pub mod config_error;
pub mod detection_error;
pub mod error_code;
pub mod extraction_error;
pub mod learn_error;
pub mod registry_error;
pub mod storage_error;
pub mod sync_error;

pub use canon_error::CanonError;
pub use config_error::ConfigError;
pub use detection_error::DetectionError;
pub use error_code::CanonErrorCode;
pub use extraction_error::ExtractionError;
pub use learn_error::LearnError;
pub use registry_error::RegistryError;
pub use storage_error::StorageError;
pub use sync_error::SyncError;
