//! Error codes and conversions.

use quarry_core::errors::{
    ConfigError, DatasetError, ModelError, PipelineError, QuarryErrorCode, SynthesisError,
};

#[test]
fn subsystem_errors_keep_their_code_through_pipeline_error() {
    let err: PipelineError = ModelError::Timeout { timeout_ms: 500 }.into();
    assert_eq!(err.error_code(), "MODEL_TIMEOUT");

    let err: PipelineError = DatasetError::EmptySchema {
        path: "db.sqlite".into(),
    }
    .into();
    assert_eq!(err.error_code(), "DATASET_ERROR");

    let err: PipelineError = SynthesisError::Unchanged.into();
    assert_eq!(err.error_code(), "SYNTHESIS_ERROR");

    assert_eq!(PipelineError::Cancelled.error_code(), "CANCELLED");
}

#[test]
fn coded_string_prefixes_the_code() {
    let err = ConfigError::ValidationFailed {
        field: "retrieval.top_k".into(),
        message: "must be greater than 0".into(),
    };
    let s = err.coded_string();
    assert!(s.starts_with("[CONFIG_ERROR] "));
    assert!(s.contains("retrieval.top_k"));
}

#[test]
fn timeouts_count_as_unavailability() {
    assert!(ModelError::Timeout { timeout_ms: 1 }.is_unavailable());
    assert!(ModelError::Unavailable {
        provider: "ollama".into()
    }
    .is_unavailable());
    assert!(!ModelError::EmptyResponse.is_unavailable());
}
