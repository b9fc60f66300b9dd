//! Structured field names used in log events across Quarry crates.

/// Stage wall time in milliseconds.
pub const STAGE_DURATION_MS: &str = "stage_duration_ms";

/// Repairs consumed by a question's attempt chain.
pub const REPAIR_ATTEMPTS: &str = "repair_attempts";

/// Fragments kept after the relevance threshold.
pub const FRAGMENTS_RETAINED: &str = "fragments_retained";

/// Ranker memo hits.
pub const RANK_CACHE_HIT: &str = "rank_cache_hit";

/// Rows returned by a query.
pub const ROW_COUNT: &str = "row_count";

/// Final confidence of an emitted answer.
pub const CONFIDENCE: &str = "confidence";

/// Model call latency in milliseconds.
pub const MODEL_LATENCY_MS: &str = "model_latency_ms";

/// Questions answered in a batch.
pub const QUESTIONS_ANSWERED: &str = "questions_answered";
