//! Dataset errors raised while opening or introspecting the database.
//!
//! Per-query failures are not errors; they are `QueryOutcome` variants.

use super::error_code::{self, QuarryErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("schema introspection failed: {reason}")]
    SchemaIntrospection { reason: String },

    #[error("dataset has no tables: {path}")]
    EmptySchema { path: String },

    #[error("connection pool unavailable: {reason}")]
    PoolUnavailable { reason: String },
}

impl QuarryErrorCode for DatasetError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PoolUnavailable { .. } => error_code::DATASET_UNAVAILABLE,
            _ => error_code::DATASET_ERROR,
        }
    }
}
