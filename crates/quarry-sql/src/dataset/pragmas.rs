//! PRAGMA configuration applied to every dataset connection.
//!
//! query_only ON, 5s busy_timeout, 64MB cache, 256MB mmap.

use quarry_core::errors::DatasetError;
use rusqlite::Connection;

pub fn apply_read_pragmas(conn: &Connection) -> Result<(), DatasetError> {
    conn.execute_batch(
        "
        PRAGMA query_only = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA cache_size = -64000;
        PRAGMA mmap_size = 268435456;
        ",
    )
    .map_err(|e| DatasetError::PoolUnavailable {
        reason: e.to_string(),
    })
}

/// Whether writes are refused on this connection.
pub fn is_query_only(conn: &Connection) -> bool {
    conn.pragma_query_value(None, "query_only", |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .unwrap_or(false)
}
