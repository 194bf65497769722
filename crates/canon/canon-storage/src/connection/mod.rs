//! Connection management: write-serialized + read-pooled.

pub mod pool;
pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use canon_core::errors::StorageError;
use rusqlite::Connection;

use self::pool::ReadPool;
use self::pragmas::{configure_writer, journal_mode, optimize_on_close};
use crate::migrations::{self, Schema};

/// Manages the single write connection and the read connection pool.
///
/// In-memory databases cannot be shared between connections, so they have
/// no read pool and route reads through the writer.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
    schema: Schema,
}

impl DatabaseManager {
    /// Open a database at the given path, apply pragmas, run migrations.
    pub fn open(path: &Path, schema: Schema, pool_size: usize) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                    message: format!("create {}: {e}", parent.display()),
                })?;
            }
        }
        let writer = Connection::open(path).map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        configure_writer(&writer, schema)?;
        let mode = journal_mode(&writer)?;
        if mode != "wal" {
            tracing::warn!(path = %path.display(), mode = %mode, "database is not in WAL mode");
        }
        migrations::run_migrations(&writer, schema)?;

        let readers = ReadPool::open(path, schema, pool_size)?;

        tracing::debug!(path = %path.display(), schema = schema.name(), "database opened");
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
            schema,
        })
    }

    /// Open an in-memory database.
    pub fn open_in_memory(schema: Schema) -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        configure_writer(&writer, schema)?;
        migrations::run_migrations(&writer, schema)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: None,
            path: None,
            schema,
        })
    }

    /// Execute a write operation with the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::SqliteError {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Execute a read operation with a pooled read connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match &self.readers {
            Some(readers) => readers.with_conn(f),
            None => self.with_writer(f),
        }
    }

    /// Run a WAL checkpoint (TRUNCATE mode).
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        if self.path.is_none() {
            return Ok(());
        }
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| StorageError::SqliteError {
                    message: e.to_string(),
                })
        })
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Whether reads go through a separate WAL reader pool.
    pub fn has_read_pool(&self) -> bool {
        self.readers.is_some()
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        if self.path.is_none() {
            return;
        }
        if let Ok(conn) = self.writer.get_mut() {
            let conn: &Connection = conn;
            let result = conn
                .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| StorageError::SqliteError {
                    message: e.to_string(),
                })
                .and_then(|()| optimize_on_close(conn));
            if let Err(e) = result {
                tracing::warn!(error = %e, "checkpoint on close failed");
            }
        }
    }
}
