//! Corpus loading errors. All of them are fatal at startup.

use super::error_code::{self, QuarryErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("documents directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("no document fragments found under {path}")]
    Empty { path: String },

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },
}

impl QuarryErrorCode for CorpusError {
    fn error_code(&self) -> &'static str {
        error_code::CORPUS_ERROR
    }
}
