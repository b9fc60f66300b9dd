//! Batch runner configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    /// Questions processed concurrently. Default: 4.
    pub max_concurrency: Option<usize>,
    /// Per-question deadline. Default: 120.
    pub question_timeout_secs: Option<u64>,
    /// Emit per-stage trace records in the output. Default: false.
    pub include_trace: Option<bool>,
}

impl BatchConfig {
    pub fn effective_max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or(defaults::DEFAULT_MAX_CONCURRENCY)
    }

    pub fn effective_question_timeout_secs(&self) -> u64 {
        self.question_timeout_secs
            .unwrap_or(defaults::DEFAULT_QUESTION_TIMEOUT_SECS)
    }

    pub fn effective_include_trace(&self) -> bool {
        self.include_trace.unwrap_or(defaults::DEFAULT_INCLUDE_TRACE)
    }
}
