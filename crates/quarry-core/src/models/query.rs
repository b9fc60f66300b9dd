//! Query attempts, outcomes and row sets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered rows returned by a successful query. Consumed by the composer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row `i` as ordered `(column, value)` pairs.
    pub fn record(&self, i: usize) -> Option<Vec<(String, Value)>> {
        self.rows.get(i).map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<(String, Value)>> + '_ {
        (0..self.rows.len()).filter_map(|i| self.record(i))
    }

    /// First column of the first row.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }
}

/// Outcome classification of one query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryOutcome {
    /// Executed cleanly with at least one row.
    Rows(RowSet),
    /// Executed cleanly, zero rows. Not an error.
    Empty { columns: Vec<String> },
    /// The query does not parse or references unknown objects; also used for
    /// statements rejected by the read-only guard.
    SyntaxFailure { reason: String },
    /// The query parsed but failed while running (type errors, timeouts).
    ExecutionFailure { reason: String },
    /// The dataset connection itself failed.
    Unavailable { reason: String },
}

/// Discriminant of `QueryOutcome`, for traces and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Empty,
    SyntaxFailure,
    ExecutionFailure,
    Unavailable,
}

impl QueryOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Rows(_) => OutcomeKind::Success,
            Self::Empty { .. } => OutcomeKind::Empty,
            Self::SyntaxFailure { .. } => OutcomeKind::SyntaxFailure,
            Self::ExecutionFailure { .. } => OutcomeKind::ExecutionFailure,
            Self::Unavailable { .. } => OutcomeKind::Unavailable,
        }
    }

    /// Syntax and execution failures are repairable.
    pub fn is_repairable(&self) -> bool {
        matches!(self, Self::SyntaxFailure { .. } | Self::ExecutionFailure { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::SyntaxFailure { reason }
            | Self::ExecutionFailure { reason }
            | Self::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&RowSet> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// How a query string was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlOrigin {
    Generated,
    Template(String),
    RuleRepair,
    GeneratedRepair,
    /// Synthesis failed; no query was executed for this attempt.
    NotSynthesized,
}

/// One link of the attempt chain. Attempt 0 is the initial synthesis,
/// attempts 1..=N are repairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAttempt {
    pub number: usize,
    pub sql: String,
    pub origin: SqlOrigin,
    pub outcome: QueryOutcome,
}

impl QueryAttempt {
    /// Whether the query actually reached the dataset.
    pub fn was_executed(&self) -> bool {
        self.origin != SqlOrigin::NotSynthesized
            && !matches!(self.outcome, QueryOutcome::Unavailable { .. })
    }
}
