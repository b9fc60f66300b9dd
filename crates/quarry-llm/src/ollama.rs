//! Ollama completion backend.
//!
//! Talks to a local Ollama server with non-streaming `/api/generate`
//! requests. Availability is established by a health check and dropped on
//! connection failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use quarry_core::config::ModelConfig;
use quarry_core::errors::ModelError;
use quarry_core::traits::{CompletionRequest, ILanguageModel};
use quarry_core::tracing::metrics;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaModel {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    available: AtomicBool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaModel {
    /// Build the client. The model starts unavailable until
    /// [`health_check`](Self::health_check) passes.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let timeout = Duration::from_secs(config.effective_timeout_secs());
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::RequestFailed {
                reason: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            model: config.effective_model(),
            timeout,
            available: AtomicBool::new(false),
        })
    }

    /// Check that the server answers `/api/tags`.
    pub fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let ok = match self.client.get(&url).timeout(HEALTH_CHECK_TIMEOUT).send() {
            Ok(resp) if resp.status().is_success() => {
                debug!(model = %self.model, "Ollama health check passed");
                true
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Ollama health check failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Ollama unreachable");
                false
            }
        };
        self.available.store(ok, Ordering::Relaxed);
        ok
    }

    fn classify(&self, error: reqwest::Error) -> ModelError {
        if error.is_timeout() {
            ModelError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_connect() {
            self.available.store(false, Ordering::Relaxed);
            ModelError::Unavailable {
                provider: format!("ollama ({})", self.base_url),
            }
        } else {
            ModelError::RequestFailed {
                reason: format!("Ollama HTTP error: {error}"),
            }
        }
    }
}

impl ILanguageModel for OllamaModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        if !self.is_available() {
            return Err(ModelError::Unavailable {
                provider: self.name().to_string(),
            });
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(ModelError::RequestFailed {
                reason: format!("Ollama returned {status}: {text}"),
            });
        }

        let parsed: GenerateResponse = response.json().map_err(|e| ModelError::RequestFailed {
            reason: format!("Ollama JSON parse error: {e}"),
        })?;
        debug!(
            kind = request.kind.as_str(),
            { metrics::MODEL_LATENCY_MS } = started.elapsed().as_millis() as u64,
            "completion received"
        );

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::traits::PromptKind;

    #[test]
    fn unreachable_server_is_unavailable() {
        let config = ModelConfig {
            base_url: Some("http://127.0.0.1:9".into()),
            timeout_secs: Some(1),
            ..ModelConfig::default()
        };
        let model = OllamaModel::new(&config).unwrap();
        assert!(!model.health_check());
        assert!(!model.is_available());
        let err = model
            .complete(&CompletionRequest::new(PromptKind::Sql, "SELECT"))
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn request_body_uses_generate_schema() {
        let body = GenerateRequest {
            model: "llama3.2:1b",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.0, num_predict: 64 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
    }
}
