//! Read-only SQLite dataset.

pub mod pragmas;
pub mod read_pool;
pub mod runner;
pub mod schema;

use std::path::Path;

use quarry_core::config::DatasetConfig;
use quarry_core::errors::DatasetError;
use quarry_core::models::{QueryOutcome, SchemaDescription};
use quarry_core::traits::IQueryExecutor;
use tracing::info;

pub use read_pool::ReadPool;
pub use runner::RunnerOptions;

/// The dataset collaborator: a read pool plus the schema captured at open.
pub struct SqliteDataset {
    pool: ReadPool,
    schema: SchemaDescription,
    options: RunnerOptions,
}

impl SqliteDataset {
    /// Open `path` read-only and introspect its schema.
    ///
    /// Fails when the file is missing, unopenable, or has no tables: every
    /// question would fail, so this is a startup error.
    pub fn open(path: &Path, config: &DatasetConfig) -> Result<Self, DatasetError> {
        if !path.is_file() {
            return Err(DatasetError::OpenFailed {
                path: path.display().to_string(),
                reason: "file does not exist".to_string(),
            });
        }
        let pool = ReadPool::open(path, config.effective_read_pool_size())?;
        let schema = pool.with_conn(schema::introspect)?;
        if schema.tables.is_empty() {
            return Err(DatasetError::EmptySchema {
                path: path.display().to_string(),
            });
        }
        info!(
            path = %path.display(),
            tables = schema.tables.len(),
            readers = pool.size(),
            "dataset opened"
        );
        Ok(Self {
            pool,
            schema,
            options: RunnerOptions::from_config(config),
        })
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }
}

impl IQueryExecutor for SqliteDataset {
    fn execute(&self, sql: &str) -> QueryOutcome {
        match self
            .pool
            .with_conn(|conn| Ok(runner::run(conn, sql, &self.options)))
        {
            Ok(outcome) => outcome,
            Err(e) => QueryOutcome::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    fn schema(&self) -> &SchemaDescription {
        &self.schema
    }
}
