//! Global aggregation database handle.

use std::path::Path;

use canon_core::errors::StorageError;

use crate::connection::DatabaseManager;
use crate::migrations::Schema;

/// The global database: project registry plus pattern aggregations.
/// Owned by the aggregator; per-project stores are only read during sync.
pub struct GlobalStore {
    db: DatabaseManager,
}

impl GlobalStore {
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open(path, Schema::Global, read_pool_size)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: DatabaseManager::open_in_memory(Schema::Global)?,
        })
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.db.checkpoint()
    }
}
