//! IQueryExecutor trait: the read-only dataset collaborator.

use crate::models::{QueryOutcome, SchemaDescription};

/// Query string in, rows or a classified failure out. Never mutates the dataset.
pub trait IQueryExecutor: Send + Sync {
    /// Execute one read-only query. Failures are values, not errors.
    fn execute(&self, sql: &str) -> QueryOutcome;

    /// Static schema description captured when the dataset was opened.
    fn schema(&self) -> &SchemaDescription;
}
