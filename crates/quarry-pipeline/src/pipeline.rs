//! Pipeline: one question, end to end.
//!
//! route → (rank) → plan → (query with repairs) → compose → validate.
//! The stages after routing come from the route's [`StagePlan`]. Every
//! question yields exactly one record; per-question failures become
//! fallback answers and never escape [`Pipeline::answer`].

use std::sync::Arc;
use std::time::Instant;

use quarry_core::config::QuarryConfig;
use quarry_core::errors::{PipelineError, QuarryErrorCode, QuarryResult};
use quarry_core::models::{
    Answer, AnswerRecord, ConstraintSet, Question, RankedFragmentSet, TraceStep,
};
use quarry_core::traits::{Cancellable, CancellationToken, ILanguageModel, IQueryExecutor};
use quarry_core::tracing::metrics;
use quarry_core::{question_span, stage_span};
use quarry_retrieval::TextRanker;
use quarry_sql::{QuerySynthesizer, SynthesisRequest, SynthesizerOptions};
use tracing::{debug, info, warn};

use crate::composer::{AnswerComposer, Composition};
use crate::plan::{Stage, StagePlan};
use crate::planner::ConstraintPlanner;
use crate::repair_controller::{AttemptChain, RepairController, RepairState};
use crate::router::{RouteClassifier, RouteOutcome};
use crate::validator::{ResponseValidator, Validated};

/// Explanation of an answer abandoned by cancellation or timeout.
pub const TIMED_OUT: &str = "timed out";

/// Per-question working state. Owned by one execution, never shared.
struct Execution {
    route: RouteOutcome,
    fragments: RankedFragmentSet,
    constraints: ConstraintSet,
    chain: Option<AttemptChain>,
    answer: Option<Answer>,
}

impl Execution {
    fn new(route: RouteOutcome) -> Self {
        Self {
            route,
            fragments: RankedFragmentSet::empty(),
            constraints: ConstraintSet::new(),
            chain: None,
            answer: None,
        }
    }

    /// Whether retrieval returned fragments or a query reached the dataset.
    fn consulted_sources(&self) -> bool {
        !self.fragments.is_empty()
            || self
                .chain
                .as_ref()
                .is_some_and(|c| c.attempts.iter().any(|a| a.was_executed()))
    }

    fn executed_sql(&self) -> String {
        self.chain
            .as_ref()
            .map(|c| c.executed_sql().to_string())
            .unwrap_or_default()
    }
}

/// The question-answering pipeline. Shared across batch workers; holds
/// only read-only collaborators.
pub struct Pipeline {
    router: RouteClassifier,
    ranker: Arc<TextRanker>,
    planner: ConstraintPlanner,
    repair: RepairController,
    composer: AnswerComposer,
    validator: ResponseValidator,
    executor: Arc<dyn IQueryExecutor>,
    include_trace: bool,
}

impl Pipeline {
    /// Wire the stages from `config`. The model is shared by routing,
    /// synthesis and composition.
    pub fn new(
        config: &QuarryConfig,
        model: Arc<dyn ILanguageModel>,
        ranker: Arc<TextRanker>,
        executor: Arc<dyn IQueryExecutor>,
    ) -> Self {
        let synthesizer = Arc::new(QuerySynthesizer::new(
            Arc::clone(&model),
            SynthesizerOptions::from_config(config),
        ));
        Self {
            router: RouteClassifier::from_config(Arc::clone(&model), config),
            composer: AnswerComposer::from_config(model, Arc::clone(&ranker), config),
            ranker,
            planner: ConstraintPlanner::new(),
            repair: RepairController::new(synthesizer, Arc::clone(&executor)),
            validator: ResponseValidator::new(),
            executor,
            include_trace: config.batch.effective_include_trace(),
        }
    }

    /// Attach per-stage trace steps to every record.
    pub fn with_trace(mut self, include_trace: bool) -> Self {
        self.include_trace = include_trace;
        self
    }

    /// Answer one question. Never fails: cancellation and unexpected
    /// errors produce a fallback record with confidence 0.
    pub fn answer(&self, question: &Question, token: &CancellationToken) -> AnswerRecord {
        let _span = question_span!(question.id).entered();
        let started = Instant::now();
        let mut trace = Vec::new();

        let (answer, sql) = match self.run(question, token, &mut trace) {
            Ok(done) => done,
            Err(PipelineError::Cancelled) => {
                warn!("question cancelled");
                (Answer::fallback(&question.format_hint, TIMED_OUT), String::new())
            }
            Err(e) => {
                warn!(error = %e, error_code = e.error_code(), "question failed");
                (Answer::fallback(&question.format_hint, &e.to_string()), String::new())
            }
        };

        info!(
            { metrics::CONFIDENCE } = answer.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            citations = answer.citations.len(),
            "question answered"
        );
        let trace = self.include_trace.then_some(trace);
        AnswerRecord::from_answer(&question.id, answer, sql, trace)
    }

    fn run(
        &self,
        question: &Question,
        token: &CancellationToken,
        trace: &mut Vec<TraceStep>,
    ) -> QuarryResult<(Answer, String)> {
        // Step 1: Route. Always first; the route selects the remaining stages.
        token.checkpoint()?;
        let started = Instant::now();
        let route = {
            let _span = stage_span!(Stage::Route).entered();
            self.router.classify(&question.question)
        };
        let summary = if route.degraded {
            format!("{} (fallback)", route.route.as_str())
        } else {
            route.route.as_str().to_string()
        };
        debug!(
            retrieval = route.route.needs_retrieval(),
            query = route.route.needs_query(),
            "route chosen"
        );
        record(trace, Stage::Route, summary, started);

        // Step 2: Walk the route's stage plan.
        let mut state = Execution::new(route);
        for stage in StagePlan::for_route(route.route) {
            let _span = stage_span!(stage).entered();
            let started = Instant::now();
            let summary = self.run_stage(stage, question, &mut state, token)?;
            record(trace, stage, summary, started);
        }

        // Step 3: Emit. Validate always runs last and leaves the answer in place.
        let answer = match state.answer.take() {
            Some(answer) => answer,
            None => Answer::fallback(&question.format_hint, "no answer was composed"),
        };
        Ok((answer, state.executed_sql()))
    }

    fn run_stage(
        &self,
        stage: Stage,
        question: &Question,
        state: &mut Execution,
        token: &CancellationToken,
    ) -> QuarryResult<String> {
        match stage {
            Stage::Route => Ok(state.route.route.as_str().to_string()),
            Stage::Rank => {
                state.fragments = self.ranker.rank(&question.question);
                Ok(format!(
                    "{} fragments: {}",
                    state.fragments.len(),
                    state.fragments.ids().join(", ")
                ))
            }
            Stage::Plan => {
                state.constraints = self.planner.plan(&question.question, &state.fragments);
                Ok(state.constraints.describe())
            }
            Stage::Query => {
                let request = SynthesisRequest {
                    question: &question.question,
                    constraints: &state.constraints,
                    schema: self.executor.schema(),
                };
                let chain = self.repair.run(&request, token)?;
                let summary = chain_summary(&chain);
                state.chain = Some(chain);
                Ok(summary)
            }
            Stage::Compose => {
                let composition = Composition {
                    question,
                    route: state.route,
                    fragments: &state.fragments,
                    constraints: &state.constraints,
                    chain: state.chain.as_ref(),
                    schema: self.executor.schema(),
                };
                let answer = self.composer.compose(&composition, token)?;
                let summary = format!("value {} at confidence {:.2}", answer.value, answer.confidence);
                state.answer = Some(answer);
                Ok(summary)
            }
            Stage::Validate => {
                let consulted = state.consulted_sources();
                let Some(answer) = state.answer.take() else {
                    return Ok("nothing to validate".to_string());
                };
                let Validated { answer, verdict } =
                    self.validator.validate(answer, &question.format_hint, consulted);
                debug!(verdict = verdict.as_str(), "answer validated");
                state.answer = Some(answer);
                Ok(verdict.as_str().to_string())
            }
        }
    }
}

fn chain_summary(chain: &AttemptChain) -> String {
    let attempts = chain.attempts.len();
    match &chain.state {
        RepairState::Succeeded => format!("succeeded after {} repairs", chain.repairs()),
        RepairState::Exhausted => format!("exhausted after {attempts} attempts"),
        RepairState::Unavailable { collaborator, .. } => format!("{collaborator} unavailable"),
        other => format!("{other:?} after {attempts} attempts"),
    }
}

fn record(trace: &mut Vec<TraceStep>, stage: Stage, summary: String, started: Instant) {
    let duration_ms = started.elapsed().as_millis() as u64;
    debug!(
        stage = stage.as_str(),
        { metrics::STAGE_DURATION_MS } = duration_ms,
        summary = %summary,
        "stage finished"
    );
    trace.push(TraceStep {
        stage: stage.as_str().to_string(),
        summary,
        duration_ms,
    });
}
