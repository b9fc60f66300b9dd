//! Answer composer configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    /// Ask the model to phrase explanations. Default: false (deterministic text).
    pub model_explanations: Option<bool>,
}

impl ComposerConfig {
    pub fn effective_model_explanations(&self) -> bool {
        self.model_explanations
            .unwrap_or(defaults::DEFAULT_MODEL_EXPLANATIONS)
    }
}
