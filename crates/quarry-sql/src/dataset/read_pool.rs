//! Pool of read-only SQLite connections, handed out round-robin.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use quarry_core::errors::DatasetError;
use rusqlite::{Connection, OpenFlags};

use super::pragmas::{apply_read_pragmas, is_query_only};

/// Maximum number of read connections.
const MAX_POOL_SIZE: usize = 16;

pub struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    /// Open `pool_size` read-only connections to `path`.
    pub fn open(path: &Path, pool_size: usize) -> Result<Self, DatasetError> {
        let size = pool_size.clamp(1, MAX_POOL_SIZE);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| DatasetError::OpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            apply_read_pragmas(&conn)?;
            if !is_query_only(&conn) {
                return Err(DatasetError::PoolUnavailable {
                    reason: "connection accepted writes after query_only was set".to_string(),
                });
            }
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Run `f` with the next connection (round-robin). Blocks while that
    /// connection is in use by another question.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatasetError>
    where
        F: FnOnce(&Connection) -> Result<T, DatasetError>,
    {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let guard = self.connections[idx]
            .lock()
            .map_err(|e| DatasetError::PoolUnavailable {
                reason: format!("read pool lock poisoned: {e}"),
            })?;
        f(&guard)
    }

    pub fn size(&self) -> usize {
        self.connections.len()
    }
}
