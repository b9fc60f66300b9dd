/// Quarry version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of repair attempts after the initial query synthesis.
/// Attempt 0 is the initial query; attempts 1..=REPAIR_BOUND are repairs.
pub const REPAIR_BOUND: usize = 2;

/// Confidence weight of the retrieval-coverage signal.
pub const RETRIEVAL_COVERAGE_WEIGHT: f64 = 0.35;

/// Confidence weight of the query-execution-success signal.
pub const EXECUTION_SUCCESS_WEIGHT: f64 = 0.35;

/// Confidence weight of the result-completeness signal.
pub const RESULT_COMPLETENESS_WEIGHT: f64 = 0.30;

/// Execution signal lost per consumed repair attempt.
pub const REPAIR_DECAY: f64 = 0.25;

/// Multiplier applied when routing fell back to hybrid after a failed classification.
pub const DEGRADED_ROUTE_FACTOR: f64 = 0.8;

/// Confidence ceiling for an answer the validator had to replace.
pub const VALIDATION_FALLBACK_CONFIDENCE: f64 = 0.05;

/// Multiplier applied when an answer that used retrieval or a query cites nothing.
pub const MISSING_CITATION_FACTOR: f64 = 0.5;

/// Fraction of list price treated as cost of goods when computing gross margin.
///
/// A modeling assumption carried forward as policy. Override with
/// `synthesis.cost_of_goods_ratio`.
pub const COST_OF_GOODS_RATIO: f64 = 0.7;

/// Maximum explanation length in characters (after sentence truncation).
pub const MAX_EXPLANATION_CHARS: usize = 280;

/// Maximum number of sentences in an explanation.
pub const MAX_EXPLANATION_SENTENCES: usize = 2;

/// Decimal places kept for float answers.
pub const FLOAT_ANSWER_DECIMALS: i32 = 2;
