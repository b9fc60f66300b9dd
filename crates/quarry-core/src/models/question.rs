use serde::{Deserialize, Serialize};

use super::FormatHint;

/// One analytics question from a batch. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within a batch.
    pub id: String,
    pub question: String,
    pub format_hint: FormatHint,
}

impl Question {
    pub fn new(id: impl Into<String>, question: impl Into<String>, hint: &str) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            format_hint: FormatHint::parse(hint),
        }
    }
}
