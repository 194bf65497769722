//! Transaction helpers: BEGIN IMMEDIATE writes, deferred read snapshots.

use canon_core::errors::StorageError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::queries::sqlite_err;

/// Execute a write operation inside a BEGIN IMMEDIATE transaction.
/// The write lock is taken at transaction start, so a merge either sees
/// SQLITE_BUSY up front or runs to completion. Any error rolls back.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(sqlite_err)?;

    let result = f(&tx)?;

    tx.commit().map_err(sqlite_err)?;
    Ok(result)
}

/// Run several reads against one consistent snapshot.
pub fn with_read_snapshot<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred).map_err(sqlite_err)?;
    let result = f(&tx)?;
    tx.commit().map_err(sqlite_err)?;
    Ok(result)
}
