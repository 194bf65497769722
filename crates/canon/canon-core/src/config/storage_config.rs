//! Storage configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Read connections per file-backed database. Default: 4.
    pub read_pool_size: Option<usize>,
    /// Directory holding the global database. Default: `~/.canon`.
    pub global_dir: Option<String>,
}

impl StorageConfig {
    pub fn effective_read_pool_size(&self) -> usize {
        self.read_pool_size
            .unwrap_or(constants::DEFAULT_READ_POOL_SIZE)
    }
}
