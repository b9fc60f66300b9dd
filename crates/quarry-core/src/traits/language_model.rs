//! ILanguageModel trait: the text-completion collaborator.

use crate::errors::ModelError;

/// What a completion request is for. Lets backends and test doubles
/// distinguish calls without parsing prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Route,
    Sql,
    Repair,
    Answer,
    Explain,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Sql => "sql",
            Self::Repair => "repair",
            Self::Answer => "answer",
            Self::Explain => "explain",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub kind: PromptKind,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(kind: PromptKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            max_tokens: 256,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Prompt in, unstructured text out. Callers impose and validate all structure.
///
/// Implementations enforce their own request timeout and report it as
/// `ModelError::Timeout`.
pub trait ILanguageModel: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;

    /// Provider name for logs and fallback explanations.
    fn name(&self) -> &str;

    /// Whether the backend is expected to answer requests.
    fn is_available(&self) -> bool;
}
