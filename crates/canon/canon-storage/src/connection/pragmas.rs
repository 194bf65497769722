//! Per-connection PRAGMA settings.
//!
//! Writers run in WAL mode with NORMAL sync and foreign keys on. Page cache
//! and busy timeout depend on the schema: the global database is small but
//! shared by every project's sync, so it waits longer for the lock.

use canon_core::errors::StorageError;
use rusqlite::Connection;

use crate::migrations::Schema;

/// Connection tuning for one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PragmaProfile {
    /// Page cache size in KiB.
    pub cache_kib: u32,
    pub busy_timeout_ms: u32,
}

impl PragmaProfile {
    pub fn for_schema(schema: Schema) -> Self {
        match schema {
            Schema::Project => Self {
                cache_kib: 64_000,
                busy_timeout_ms: 5_000,
            },
            Schema::Global => Self {
                cache_kib: 16_000,
                busy_timeout_ms: 10_000,
            },
        }
    }

    fn common(&self) -> String {
        format!(
            "PRAGMA cache_size = -{};\nPRAGMA busy_timeout = {};\nPRAGMA temp_store = MEMORY;\n",
            self.cache_kib, self.busy_timeout_ms
        )
    }
}

/// Configure the single writer connection of a database.
pub fn configure_writer(conn: &Connection, schema: Schema) -> Result<(), StorageError> {
    // auto_vacuum only applies before the first table exists.
    let sql = format!(
        "PRAGMA auto_vacuum = INCREMENTAL;\n\
         PRAGMA journal_mode = WAL;\n\
         PRAGMA synchronous = NORMAL;\n\
         PRAGMA foreign_keys = ON;\n{}",
        PragmaProfile::for_schema(schema).common()
    );
    conn.execute_batch(&sql).map_err(|e| pragma_err("writer", e))
}

/// Configure a pooled reader. Readers can never write.
pub fn configure_reader(conn: &Connection, schema: Schema) -> Result<(), StorageError> {
    let sql = format!(
        "PRAGMA query_only = ON;\n{}",
        PragmaProfile::for_schema(schema).common()
    );
    conn.execute_batch(&sql).map_err(|e| pragma_err("reader", e))
}

/// The connection's journal mode, lowercased (`wal`, `memory`, ...).
pub fn journal_mode(conn: &Connection) -> Result<String, StorageError> {
    conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))
        .map(|mode| mode.to_ascii_lowercase())
        .map_err(|e| pragma_err("journal_mode", e))
}

/// Refresh planner statistics before the writer closes.
pub fn optimize_on_close(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA analysis_limit = 400;\nPRAGMA optimize;")
        .map_err(|e| pragma_err("optimize", e))
}

fn pragma_err(stage: &str, e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: format!("{stage} pragmas: {e}"),
    }
}
