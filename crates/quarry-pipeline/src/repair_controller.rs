//! Repair Controller: the bounded attempt chain.
//!
//! ```text
//! AttemptPending --rows/empty--> Succeeded
//! AttemptPending --syntax/execution failure or malformed query, repairs < bound--> Repairing --> AttemptPending
//! AttemptPending --syntax/execution failure or malformed query, repairs == bound--> Exhausted
//! AttemptPending --repair repeats the failed query--> Exhausted
//! AttemptPending --dataset or model unreachable--> Unavailable
//! ```
//!
//! The chain is an ordered list capped at `1 + bound` attempts. Empty
//! results end the chain without consuming a repair.

use std::sync::Arc;

use quarry_core::constants::REPAIR_BOUND;
use quarry_core::errors::{QuarryResult, SynthesisError};
use quarry_core::models::{QueryAttempt, QueryOutcome, SqlOrigin};
use quarry_core::tracing::metrics;
use quarry_core::attempt_span;
use quarry_core::traits::{Cancellable, IQueryExecutor};
use quarry_sql::{QuerySynthesizer, SynthesisRequest, SynthesizedQuery};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairState {
    AttemptPending,
    Repairing,
    Succeeded,
    Exhausted,
    /// A collaborator could not be reached; no further attempts are made.
    Unavailable { collaborator: String, reason: String },
}

/// The ordered attempts for one question and the terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptChain {
    pub attempts: Vec<QueryAttempt>,
    pub state: RepairState,
}

impl AttemptChain {
    pub fn last(&self) -> Option<&QueryAttempt> {
        self.attempts.last()
    }

    /// Attempts after the initial one.
    pub fn repairs(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn succeeded(&self) -> bool {
        self.state == RepairState::Succeeded
    }

    /// Rows of the successful attempt, if it returned any.
    pub fn rows(&self) -> Option<&quarry_core::models::RowSet> {
        match self.state {
            RepairState::Succeeded => self.last().and_then(|a| a.outcome.rows()),
            _ => None,
        }
    }

    /// Text of the last query that reached the dataset; empty when none did.
    pub fn executed_sql(&self) -> &str {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.was_executed())
            .map_or("", |a| a.sql.as_str())
    }
}

pub struct RepairController {
    synthesizer: Arc<QuerySynthesizer>,
    executor: Arc<dyn IQueryExecutor>,
    bound: usize,
}

impl RepairController {
    pub fn new(synthesizer: Arc<QuerySynthesizer>, executor: Arc<dyn IQueryExecutor>) -> Self {
        Self {
            synthesizer,
            executor,
            bound: REPAIR_BOUND,
        }
    }

    /// Drive the chain to a terminal state. Only cancellation is an error.
    pub fn run(
        &self,
        request: &SynthesisRequest<'_>,
        token: &dyn Cancellable,
    ) -> QuarryResult<AttemptChain> {
        let mut attempts: Vec<QueryAttempt> = Vec::with_capacity(self.bound + 1);
        let mut state = RepairState::AttemptPending;
        debug!(?state, bound = self.bound, "attempt chain started");

        token.checkpoint()?;
        let mut next = self.synthesizer.synthesize(request);

        loop {
            let number = attempts.len();
            let _span = attempt_span!(number).entered();

            match next {
                Ok(query) => {
                    token.checkpoint()?;
                    let outcome = self.executor.execute(&query.sql);
                    debug!(kind = ?outcome.kind(), origin = ?query.origin, "attempt executed");
                    let SynthesizedQuery { sql, origin } = query;
                    attempts.push(QueryAttempt {
                        number,
                        sql,
                        origin,
                        outcome,
                    });
                }
                Err(e) => {
                    attempts.push(not_synthesized(number, &e));
                    if let Some(terminal) = terminal_synthesis_state(&e) {
                        state = terminal;
                        break;
                    }
                }
            }

            let Some(last) = attempts.last() else {
                break;
            };
            match &last.outcome {
                QueryOutcome::Rows(_) | QueryOutcome::Empty { .. } => {
                    state = RepairState::Succeeded;
                    break;
                }
                QueryOutcome::Unavailable { reason } => {
                    state = RepairState::Unavailable {
                        collaborator: "dataset".to_string(),
                        reason: reason.clone(),
                    };
                    break;
                }
                outcome if outcome.is_repairable() => {
                    if number >= self.bound {
                        state = RepairState::Exhausted;
                        break;
                    }
                    state = RepairState::Repairing;
                    debug!(?state, reason = outcome.failure_reason().unwrap_or(""), "repairing");
                    token.checkpoint()?;
                    next = self.synthesizer.repair(request, last);
                }
                _ => {
                    state = RepairState::Exhausted;
                    break;
                }
            }
        }

        let chain = AttemptChain { attempts, state };
        info!(
            state = ?chain.state,
            { metrics::REPAIR_ATTEMPTS } = chain.repairs(),
            "attempt chain finished"
        );
        Ok(chain)
    }
}

/// `None` for a malformed query, which is repaired like a syntax failure.
fn terminal_synthesis_state(error: &SynthesisError) -> Option<RepairState> {
    match error {
        SynthesisError::BackendUnavailable { collaborator } => Some(RepairState::Unavailable {
            collaborator: format!("language model '{collaborator}'"),
            reason: error.to_string(),
        }),
        SynthesisError::Unchanged => Some(RepairState::Exhausted),
        SynthesisError::Malformed { .. } => None,
    }
}

/// Records a failed synthesis. A malformed query keeps its text so repair
/// can see it; it never reaches the dataset.
fn not_synthesized(number: usize, error: &SynthesisError) -> QueryAttempt {
    let sql = match error {
        SynthesisError::Malformed { sql, .. } => sql.clone(),
        _ => String::new(),
    };
    QueryAttempt {
        number,
        sql,
        origin: SqlOrigin::NotSynthesized,
        outcome: QueryOutcome::SyntaxFailure {
            reason: error.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::models::{ConstraintSet, RowSet, SchemaDescription, TableSchema};
    use quarry_core::traits::{CancellationToken, PromptKind};
    use quarry_sql::SynthesizerOptions;
    use serde_json::json;
    use std::sync::Mutex;
    use test_fixtures::ScriptedModel;

    /// Replays outcomes in order and records executed SQL.
    struct ScriptedExecutor {
        outcomes: Mutex<Vec<QueryOutcome>>,
        executed: Mutex<Vec<String>>,
        schema: SchemaDescription,
    }

    impl ScriptedExecutor {
        fn new(outcomes: Vec<QueryOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().rev().collect()),
                executed: Mutex::new(Vec::new()),
                schema: SchemaDescription::new(vec![TableSchema { name: "Orders".into(), columns: vec![] }]),
            }
        }
    }

    impl IQueryExecutor for ScriptedExecutor {
        fn execute(&self, sql: &str) -> QueryOutcome {
            self.executed.lock().unwrap().push(sql.to_string());
            self.outcomes.lock().unwrap().pop().unwrap_or(QueryOutcome::SyntaxFailure {
                reason: "no scripted outcome".into(),
            })
        }

        fn schema(&self) -> &SchemaDescription {
            &self.schema
        }
    }

    fn syntax(reason: &str) -> QueryOutcome {
        QueryOutcome::SyntaxFailure { reason: reason.into() }
    }

    fn controller(model: ScriptedModel, executor: Arc<ScriptedExecutor>) -> RepairController {
        let synth = QuerySynthesizer::new(Arc::new(model), SynthesizerOptions::default());
        RepairController::new(Arc::new(synth), executor)
    }

    fn run(c: &RepairController, executor: &ScriptedExecutor) -> AttemptChain {
        let constraints = ConstraintSet::new();
        let request = SynthesisRequest {
            question: "How many orders?",
            constraints: &constraints,
            schema: executor.schema(),
        };
        c.run(&request, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn success_on_first_attempt() {
        let exec = Arc::new(ScriptedExecutor::new(vec![QueryOutcome::Rows(RowSet::new(
            vec!["n".into()],
            vec![vec![json!(8)]],
        ))]));
        let model = ScriptedModel::new().reply(PromptKind::Sql, "SELECT COUNT(*) AS n FROM Orders");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Succeeded);
        assert_eq!(chain.repairs(), 0);
        assert_eq!(chain.executed_sql(), "SELECT COUNT(*) AS n FROM Orders");
    }

    #[test]
    fn repairs_are_bounded() {
        let exec = Arc::new(ScriptedExecutor::new(vec![syntax("a"), syntax("b"), syntax("c"), syntax("d")]));
        let model = ScriptedModel::new()
            .reply(PromptKind::Sql, "SELECT 1 FROM Orders")
            .reply(PromptKind::Repair, "SELECT 2 FROM Orders")
            .reply(PromptKind::Repair, "SELECT 3 FROM Orders")
            .reply(PromptKind::Repair, "SELECT 4 FROM Orders");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Exhausted);
        assert_eq!(chain.repairs(), REPAIR_BOUND);
        assert_eq!(exec.executed.lock().unwrap().len(), REPAIR_BOUND + 1);
        let numbers: Vec<usize> = chain.attempts.iter().map(|a| a.number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn empty_result_ends_the_chain() {
        let exec = Arc::new(ScriptedExecutor::new(vec![QueryOutcome::Empty { columns: vec!["n".into()] }]));
        let model = ScriptedModel::new().reply(PromptKind::Sql, "SELECT 1 FROM Orders");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Succeeded);
        assert!(chain.rows().is_none());
        assert_eq!(chain.repairs(), 0);
    }

    #[test]
    fn unchanged_repair_exhausts() {
        let exec = Arc::new(ScriptedExecutor::new(vec![syntax("no such column: x")]));
        let model = ScriptedModel::new()
            .reply(PromptKind::Sql, "SELECT x FROM Orders")
            .reply(PromptKind::Repair, "SELECT x FROM Orders");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Exhausted);
        assert_eq!(chain.attempts.len(), 2);
        assert_eq!(chain.last().unwrap().origin, SqlOrigin::NotSynthesized);
        assert_eq!(chain.executed_sql(), "SELECT x FROM Orders");
    }

    #[test]
    fn malformed_first_query_is_repaired() {
        let exec = Arc::new(ScriptedExecutor::new(vec![QueryOutcome::Rows(RowSet::new(
            vec!["n".into()],
            vec![vec![json!(8)]],
        ))]));
        let model = ScriptedModel::new()
            .reply(PromptKind::Sql, "SELECT COUNT(*) AS n FROM Invoices")
            .reply(PromptKind::Repair, "SELECT COUNT(*) AS n FROM Orders");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Succeeded);
        assert_eq!(chain.repairs(), 1);
        let first = &chain.attempts[0];
        assert_eq!(first.origin, SqlOrigin::NotSynthesized);
        assert_eq!(first.sql, "SELECT COUNT(*) AS n FROM Invoices");
        assert!(first.outcome.failure_reason().unwrap().contains("unknown table"));
        assert_eq!(*exec.executed.lock().unwrap(), vec!["SELECT COUNT(*) AS n FROM Orders"]);
    }

    #[test]
    fn malformed_queries_exhaust_at_the_bound() {
        let exec = Arc::new(ScriptedExecutor::new(vec![]));
        let model = ScriptedModel::new()
            .reply(PromptKind::Sql, "SELECT 1 FROM Invoices")
            .reply(PromptKind::Repair, "SELECT 2 FROM Invoices")
            .reply(PromptKind::Repair, "SELECT 3 FROM Invoices");
        let chain = run(&controller(model, exec.clone()), &exec);
        assert_eq!(chain.state, RepairState::Exhausted);
        assert_eq!(chain.attempts.len(), REPAIR_BOUND + 1);
        assert!(chain.attempts.iter().all(|a| a.origin == SqlOrigin::NotSynthesized));
        assert_eq!(chain.last().unwrap().sql, "SELECT 3 FROM Invoices");
        assert!(exec.executed.lock().unwrap().is_empty());
        assert_eq!(chain.executed_sql(), "");
    }

    #[test]
    fn unreachable_model_without_template_is_unavailable() {
        let exec = Arc::new(ScriptedExecutor::new(vec![]));
        let chain = run(&controller(ScriptedModel::unavailable(), exec.clone()), &exec);
        assert!(matches!(chain.state, RepairState::Unavailable { .. }));
        assert_eq!(chain.executed_sql(), "");
        assert!(exec.executed.lock().unwrap().is_empty());
    }

    #[test]
    fn cancellation_stops_before_execution() {
        let exec = Arc::new(ScriptedExecutor::new(vec![]));
        let c = controller(ScriptedModel::new(), exec.clone());
        let token = CancellationToken::new();
        token.cancel();
        let constraints = ConstraintSet::new();
        let request = SynthesisRequest {
            question: "q",
            constraints: &constraints,
            schema: exec.schema(),
        };
        assert!(c.run(&request, &token).is_err());
        assert!(exec.executed.lock().unwrap().is_empty());
    }
}
