//! Filesystem-backed source reader.

use std::path::Path;

use canon_core::errors::ExtractionError;
use canon_core::traits::SourceReader;

/// Reads project files from disk, refusing files over `max_file_size` bytes.
#[derive(Debug, Clone)]
pub struct FsSourceReader {
    max_file_size: u64,
}

impl FsSourceReader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

impl Default for FsSourceReader {
    fn default() -> Self {
        Self::new(canon_core::constants::DEFAULT_MAX_FILE_SIZE)
    }
}

impl SourceReader for FsSourceReader {
    fn read(&self, project_root: &Path, relative_path: &str) -> Result<String, ExtractionError> {
        let full_path = project_root.join(relative_path);
        let read_failed = |e: std::io::Error| ExtractionError::ReadFailed {
            path: relative_path.to_string(),
            message: e.to_string(),
        };

        let metadata = std::fs::metadata(&full_path).map_err(read_failed)?;
        if metadata.len() > self.max_file_size {
            return Err(ExtractionError::FileTooLarge {
                path: relative_path.to_string(),
                size: metadata.len(),
                max: self.max_file_size,
            });
        }
        std::fs::read_to_string(&full_path).map_err(read_failed)
    }
}
