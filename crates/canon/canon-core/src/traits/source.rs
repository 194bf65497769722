//! Source reading collaborator.

use std::path::Path;

use crate::errors::ExtractionError;

/// Reads the current text of a project file.
pub trait SourceReader: Send + Sync {
    /// Read `relative_path` under `project_root`.
    fn read(&self, project_root: &Path, relative_path: &str) -> Result<String, ExtractionError>;
}
