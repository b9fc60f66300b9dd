//! # quarry-llm
//!
//! Language-model backends behind `ILanguageModel`.
//!
//! - [`OllamaModel`]: local Ollama server over HTTP (`/api/generate`).
//! - [`OfflineModel`]: never available; the pipeline runs on templates and
//!   deterministic composition.
//! - [`BoundedModel`]: caps outstanding calls to any backend.

pub mod bounded;
pub mod offline;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;

pub use bounded::BoundedModel;
pub use offline::OfflineModel;
pub use ollama::OllamaModel;

use quarry_core::config::{ModelConfig, ModelProvider};
use quarry_core::traits::ILanguageModel;
use tracing::{info, warn};

/// Create the configured backend.
///
/// An Ollama server that fails its health check degrades to the offline
/// backend rather than failing startup.
pub fn create_model(config: &ModelConfig) -> Arc<dyn ILanguageModel> {
    match config.effective_provider() {
        ModelProvider::Offline => {
            info!(provider = "offline", "language model disabled");
            Arc::new(OfflineModel::new())
        }
        ModelProvider::Ollama => match OllamaModel::new(config) {
            Ok(model) if model.health_check() => {
                info!(provider = "ollama", model = model.name(), "language model connected");
                let wait = Duration::from_secs(config.effective_timeout_secs());
                Arc::new(BoundedModel::new(
                    Arc::new(model),
                    config.effective_max_outstanding(),
                    wait,
                ))
            }
            Ok(_) => {
                warn!(base_url = %config.effective_base_url(), "Ollama unreachable, running offline");
                Arc::new(OfflineModel::new())
            }
            Err(e) => {
                warn!(error = %e, "Ollama client could not be built, running offline");
                Arc::new(OfflineModel::new())
            }
        },
    }
}
