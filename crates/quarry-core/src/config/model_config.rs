//! Language-model backend configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Which completion backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    #[default]
    Ollama,
    /// No backend. Every stage runs its local fallback.
    Offline,
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "offline" | "none" => Ok(Self::Offline),
            other => Err(format!("unknown model provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: Option<ModelProvider>,
    /// Ollama server URL. Default: http://localhost:11434.
    pub base_url: Option<String>,
    /// Model name. Default: llama3.2:1b.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-request timeout. Default: 60.
    pub timeout_secs: Option<u64>,
    /// Maximum concurrent outstanding requests. Default: 2.
    pub max_outstanding: Option<usize>,
}

impl ModelConfig {
    pub fn effective_provider(&self) -> ModelProvider {
        self.provider.unwrap_or_default()
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_MODEL_BASE_URL.to_string())
    }

    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_MODEL_NAME.to_string())
    }

    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(defaults::DEFAULT_MODEL_TEMPERATURE)
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(defaults::DEFAULT_MODEL_MAX_TOKENS)
    }

    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(defaults::DEFAULT_MODEL_TIMEOUT_SECS)
    }

    pub fn effective_max_outstanding(&self) -> usize {
        self.max_outstanding
            .unwrap_or(defaults::DEFAULT_MODEL_MAX_OUTSTANDING)
    }
}
