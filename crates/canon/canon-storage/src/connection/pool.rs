//! Round-robin pool of read-only connections.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use canon_core::errors::StorageError;
use rusqlite::{Connection, OpenFlags};

use super::pragmas::configure_reader;
use crate::migrations::Schema;

const MAX_READERS: usize = 8;

/// Read-only connections under WAL. Each reader sees a consistent snapshot
/// and never blocks the writer.
pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    pub fn open(path: &Path, schema: Schema, size: usize) -> Result<Self, StorageError> {
        let size = size.clamp(1, MAX_READERS);
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..size)
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags).map_err(|e| {
                    StorageError::SqliteError {
                        message: format!("open reader {}: {e}", path.display()),
                    }
                })?;
                configure_reader(&conn, schema)?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Run `f` on a reader. Starts at the next reader in turn and takes the
    /// first idle one; waits on the starting reader only if all are busy.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let guard = self.acquire(start)?;
        f(&guard)
    }

    fn acquire(&self, start: usize) -> Result<MutexGuard<'_, Connection>, StorageError> {
        let n = self.readers.len();
        for offset in 0..n {
            match self.readers[(start + offset) % n].try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(poisoned()),
            }
        }
        self.readers[start].lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> StorageError {
    StorageError::SqliteError {
        message: "reader lock poisoned".to_string(),
    }
}
