//! Language-model backend errors.

use super::error_code::{self, QuarryErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model provider unavailable: {provider}")]
    Unavailable { provider: String },

    #[error("model request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("model request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("model returned an empty response")]
    EmptyResponse,
}

impl ModelError {
    /// Whether the error means the backend cannot be reached at all,
    /// as opposed to a single bad response.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl QuarryErrorCode for ModelError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => error_code::MODEL_UNAVAILABLE,
            Self::Timeout { .. } => error_code::MODEL_TIMEOUT,
            _ => error_code::MODEL_ERROR,
        }
    }
}
