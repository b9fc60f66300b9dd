//! # quarry-core
//!
//! Foundation crate for the Quarry analytics pipeline.
//! Defines the domain types, collaborator traits, errors, config, tracing setup
//! and constants. Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;
pub mod tracing;

// Re-export the most commonly used types at the crate root.
pub use config::QuarryConfig;
pub use errors::{PipelineError, QuarryErrorCode, QuarryResult};
pub use models::{
    Answer, AnswerRecord, ConstraintSet, FormatHint, Fragment, QueryAttempt, QueryOutcome,
    Question, RankedFragmentSet, RouteDecision, RowSet, SchemaDescription,
};
pub use traits::{CancellationToken, ILanguageModel, IQueryExecutor};
