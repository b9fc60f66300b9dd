//! Backend used when no model is configured or reachable.

use quarry_core::errors::ModelError;
use quarry_core::traits::{CompletionRequest, ILanguageModel};

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineModel;

impl OfflineModel {
    pub fn new() -> Self {
        Self
    }
}

impl ILanguageModel for OfflineModel {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, ModelError> {
        Err(ModelError::Unavailable {
            provider: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "offline"
    }

    fn is_available(&self) -> bool {
        false
    }
}
