//! Per-project pattern store handle.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use canon_core::constants;
use canon_core::errors::StorageError;

use crate::connection::DatabaseManager;
use crate::migrations::Schema;
use crate::queries::{concepts, patterns, store_meta};

/// One project's pattern store.
///
/// Single-writer: every merge holds `merge_lock` for its whole duration, so
/// at most one merge is in flight per project. Readers go through the WAL
/// read pool and are never blocked by a merge.
pub struct PatternStore {
    db: DatabaseManager,
    merge_lock: Mutex<()>,
    root: PathBuf,
}

impl PatternStore {
    /// Open (or create) the store at `<root>/.canon/patterns.db`.
    pub fn open_for_project(root: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let db_path = root
            .join(constants::DATA_DIR_NAME)
            .join(constants::PROJECT_DB_FILE);
        Self::open(&db_path, root, read_pool_size)
    }

    /// Open a store database at an explicit path for the project at `root`.
    pub fn open(db_path: &Path, root: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let db = DatabaseManager::open(db_path, Schema::Project, read_pool_size)?;
        Ok(Self {
            db,
            merge_lock: Mutex::new(()),
            root: root.to_path_buf(),
        })
    }

    /// Open an in-memory store whose sources live under `root`.
    pub fn open_in_memory(root: &Path) -> Result<Self, StorageError> {
        let db = DatabaseManager::open_in_memory(Schema::Project)?;
        Ok(Self {
            db,
            merge_lock: Mutex::new(()),
            root: root.to_path_buf(),
        })
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    /// Project root the store's relative paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Acquire the single-merge lock.
    pub fn lock_merge(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.merge_lock.lock().map_err(|_| StorageError::SqliteError {
            message: "merge lock poisoned".to_string(),
        })
    }

    /// Current store version as seen by a reader.
    pub fn current_version(&self) -> Result<u64, StorageError> {
        self.db
            .with_reader(store_meta::current_version)
            .map(|v| v.max(0) as u64)
    }

    pub fn pattern_count(&self) -> Result<u64, StorageError> {
        self.db
            .with_reader(patterns::count_patterns)
            .map(|v| v.max(0) as u64)
    }

    pub fn concept_count(&self) -> Result<u64, StorageError> {
        self.db
            .with_reader(concepts::count_concepts)
            .map(|v| v.max(0) as u64)
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.db.checkpoint()
    }
}
