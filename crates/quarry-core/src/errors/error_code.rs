//! QuarryErrorCode trait: stable error codes for logs and fallback explanations.

/// Every error enum implements this to provide a structured error code string.
pub trait QuarryErrorCode {
    /// Returns the error code string (e.g., "CORPUS_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CORPUS_ERROR: &str = "CORPUS_ERROR";
pub const DATASET_ERROR: &str = "DATASET_ERROR";
pub const DATASET_UNAVAILABLE: &str = "DATASET_UNAVAILABLE";
pub const MODEL_ERROR: &str = "MODEL_ERROR";
pub const MODEL_UNAVAILABLE: &str = "MODEL_UNAVAILABLE";
pub const MODEL_TIMEOUT: &str = "MODEL_TIMEOUT";
pub const SYNTHESIS_ERROR: &str = "SYNTHESIS_ERROR";
pub const COLLABORATOR_UNAVAILABLE: &str = "COLLABORATOR_UNAVAILABLE";
pub const CANCELLED: &str = "CANCELLED";
