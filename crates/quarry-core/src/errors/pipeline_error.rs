//! Pipeline errors. Aggregates subsystem errors via `From` conversions.

use super::error_code::{self, QuarryErrorCode};
use super::{ConfigError, CorpusError, DatasetError, ModelError, SynthesisError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// A collaborator could not be reached and the stage has no local fallback.
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable { collaborator: String, reason: String },

    #[error("Pipeline cancelled")]
    Cancelled,
}

impl QuarryErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Corpus(e) => e.error_code(),
            Self::Dataset(e) => e.error_code(),
            Self::Model(e) => e.error_code(),
            Self::Synthesis(e) => e.error_code(),
            Self::CollaboratorUnavailable { .. } => error_code::COLLABORATOR_UNAVAILABLE,
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}

pub type QuarryResult<T> = Result<T, PipelineError>;
