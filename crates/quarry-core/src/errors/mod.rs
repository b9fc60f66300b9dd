//! Error handling for Quarry.
//! One error enum per subsystem, `thiserror` only. `anyhow` stays in the binary.

pub mod config_error;
pub mod corpus_error;
pub mod dataset_error;
pub mod error_code;
pub mod model_error;
pub mod pipeline_error;
pub mod synthesis_error;

pub use config_error::ConfigError;
pub use corpus_error::CorpusError;
pub use dataset_error::DatasetError;
pub use error_code::QuarryErrorCode;
pub use model_error::ModelError;
pub use pipeline_error::{PipelineError, QuarryResult};
pub use synthesis_error::SynthesisError;
