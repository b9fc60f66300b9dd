//! Deterministic stand-in for the language-model backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use quarry_core::errors::ModelError;
use quarry_core::traits::{CompletionRequest, ILanguageModel, PromptKind};

enum Reply {
    Text(String),
    Fail(String),
}

/// Canned replies keyed by prompt kind.
///
/// Queued replies are consumed first, then the kind's fixed reply. A call
/// with neither fails with `RequestFailed`. Every request is recorded.
#[derive(Default)]
pub struct ScriptedModel {
    queued: Mutex<HashMap<PromptKind, VecDeque<Reply>>>,
    fixed: HashMap<PromptKind, String>,
    calls: Mutex<Vec<CompletionRequest>>,
    unavailable: AtomicBool,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that cannot be reached: every call returns `Unavailable`.
    pub fn unavailable() -> Self {
        let model = Self::new();
        model.unavailable.store(true, Ordering::SeqCst);
        model
    }

    /// Queue one reply for `kind`.
    pub fn reply(self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.push(kind, Reply::Text(text.into()));
        self
    }

    /// Queue one failed call for `kind`.
    pub fn fail(self, kind: PromptKind, reason: impl Into<String>) -> Self {
        self.push(kind, Reply::Fail(reason.into()));
        self
    }

    /// Reply used for `kind` whenever its queue is empty.
    pub fn always(mut self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.fixed.insert(kind, text.into());
        self
    }

    fn push(&self, kind: PromptKind, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls made with `kind`.
    pub fn calls(&self, kind: PromptKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompts sent with `kind`, in call order.
    pub fn prompts(&self, kind: PromptKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.prompt.clone())
            .collect()
    }
}

impl ILanguageModel for ScriptedModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ModelError::Unavailable {
                provider: "scripted".to_string(),
            });
        }
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&request.kind)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(reason)) => Err(ModelError::RequestFailed { reason }),
            None => self
                .fixed
                .get(&request.kind)
                .cloned()
                .ok_or_else(|| ModelError::RequestFailed {
                    reason: format!("no scripted reply for {}", request.kind.as_str()),
                }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}
