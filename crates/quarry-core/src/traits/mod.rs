//! Collaborator traits and cooperative cancellation.
//! All traits are `Send + Sync`; stages are synchronous and run on blocking workers.

pub mod cancellation;
pub mod language_model;
pub mod query_executor;

pub use cancellation::{Cancellable, CancellationToken};
pub use language_model::{CompletionRequest, ILanguageModel, PromptKind};
pub use query_executor::IQueryExecutor;
