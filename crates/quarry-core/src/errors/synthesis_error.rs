//! Query synthesis errors.

use super::error_code::{self, QuarryErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The generative path is unreachable and no template matched.
    #[error("{collaborator} unavailable and no template matches the question")]
    BackendUnavailable { collaborator: String },

    /// Output failed the well-formedness guard and no template matched.
    /// `sql` is the rejected text, empty when the reply held no query.
    #[error("malformed query: {reason}")]
    Malformed { sql: String, reason: String },

    /// A repair produced the same query text as the failing attempt.
    #[error("repair produced no change to the failing query")]
    Unchanged,
}

impl QuarryErrorCode for SynthesisError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BackendUnavailable { .. } => error_code::MODEL_UNAVAILABLE,
            _ => error_code::SYNTHESIS_ERROR,
        }
    }
}
