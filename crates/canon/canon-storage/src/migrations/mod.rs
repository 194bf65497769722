//! Schema migrations using PRAGMA user_version.
//!
//! Two schemas share this machinery: the per-project pattern store and the
//! global aggregation database. Each keeps its own migration list.

pub mod global_v001_projects;
pub mod global_v002_aggregations;
pub mod v001_patterns;
pub mod v002_learning_log;
pub mod v003_exceptions;

use canon_core::errors::StorageError;
use rusqlite::Connection;

/// Which database a connection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Per-project pattern store.
    Project,
    /// Global registry and aggregations.
    Global,
}

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Global => "global",
        }
    }

    fn migrations(&self) -> &'static [(&'static str, u32)] {
        match self {
            Self::Project => &[
                (v001_patterns::MIGRATION_SQL, 1),
                (v002_learning_log::MIGRATION_SQL, 2),
                (v003_exceptions::MIGRATION_SQL, 3),
            ],
            Self::Global => &[
                (global_v001_projects::MIGRATION_SQL, 1),
                (global_v002_aggregations::MIGRATION_SQL, 2),
            ],
        }
    }
}

/// Run all pending migrations for `schema`.
pub fn run_migrations(conn: &Connection, schema: Schema) -> Result<(), StorageError> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })?;

    for (sql, version) in schema.migrations() {
        if current_version < *version {
            conn.execute_batch(sql).map_err(|e| StorageError::MigrationFailed {
                version: *version,
                message: e.to_string(),
            })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, schema = schema.name(), "applied migration");
        }
    }

    Ok(())
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

/// Latest schema version known for `schema`.
pub fn latest_version(schema: Schema) -> u32 {
    schema
        .migrations()
        .last()
        .map(|(_, version)| *version)
        .unwrap_or(0)
}
