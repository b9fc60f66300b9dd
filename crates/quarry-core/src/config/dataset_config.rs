//! Dataset connection configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatasetConfig {
    /// SQLite database file. Opened read-only.
    pub path: Option<PathBuf>,
    /// Read connections. Default: 4.
    pub read_pool_size: Option<usize>,
    /// Per-query timeout. Default: 5000.
    pub query_timeout_ms: Option<u64>,
    /// Rows fetched per query at most. Default: 1000.
    pub max_rows: Option<usize>,
}

impl DatasetConfig {
    pub fn effective_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_DATASET_PATH))
    }

    pub fn effective_read_pool_size(&self) -> usize {
        self.read_pool_size.unwrap_or(defaults::DEFAULT_READ_POOL_SIZE)
    }

    pub fn effective_query_timeout_ms(&self) -> u64 {
        self.query_timeout_ms
            .unwrap_or(defaults::DEFAULT_QUERY_TIMEOUT_MS)
    }

    pub fn effective_max_rows(&self) -> usize {
        self.max_rows.unwrap_or(defaults::DEFAULT_MAX_ROWS)
    }
}
