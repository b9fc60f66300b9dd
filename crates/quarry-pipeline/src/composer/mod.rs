//! Answer Composer.
//!
//! Query and hybrid routes shape the successful attempt's rows into the
//! declared hint. Retrieval-only routes read the answer out of the ranked
//! fragments: the language model is asked first, then the best matching
//! fragment line is used. Every path yields a typed value; missing data
//! becomes the hint's zero value with lowered confidence.

pub mod explain;
pub mod extract;
pub mod shape;

use std::sync::Arc;

use quarry_core::config::QuarryConfig;
use quarry_core::errors::QuarryResult;
use quarry_core::models::{
    Answer, ConstraintSet, FormatHint, Question, RankedFragment, RankedFragmentSet,
    SchemaDescription,
};
use quarry_core::traits::{Cancellable, CompletionRequest, ILanguageModel, PromptKind};
use quarry_retrieval::TextRanker;
use serde_json::Value;
use tracing::{debug, warn};

use crate::confidence::{ConfidenceEstimator, Signals};
use crate::repair_controller::{AttemptChain, RepairState};
use crate::router::RouteOutcome;

/// Fragments quoted into the answer prompt.
const PROMPT_FRAGMENTS: usize = 3;

/// Everything one question produced before composition.
#[derive(Debug, Clone, Copy)]
pub struct Composition<'a> {
    pub question: &'a Question,
    pub route: RouteOutcome,
    pub fragments: &'a RankedFragmentSet,
    pub constraints: &'a ConstraintSet,
    /// Present when the route ran the query stage.
    pub chain: Option<&'a AttemptChain>,
    pub schema: &'a SchemaDescription,
}

/// Value, explanation and the fragments that actually supported it.
struct Draft<'a> {
    value: Option<Value>,
    explanation: String,
    contributing: Vec<&'a RankedFragment>,
}

pub struct AnswerComposer {
    model: Arc<dyn ILanguageModel>,
    ranker: Arc<TextRanker>,
    estimator: ConfidenceEstimator,
    model_explanations: bool,
    max_tokens: u32,
}

impl AnswerComposer {
    pub fn new(
        model: Arc<dyn ILanguageModel>,
        ranker: Arc<TextRanker>,
        estimator: ConfidenceEstimator,
    ) -> Self {
        Self {
            model,
            ranker,
            estimator,
            model_explanations: false,
            max_tokens: 256,
        }
    }

    pub fn from_config(
        model: Arc<dyn ILanguageModel>,
        ranker: Arc<TextRanker>,
        config: &QuarryConfig,
    ) -> Self {
        Self {
            model_explanations: config.composer.effective_model_explanations(),
            max_tokens: config.model.effective_max_tokens(),
            ..Self::new(model, ranker, ConfidenceEstimator::new(&config.confidence))
        }
    }

    /// Ask the model to phrase explanations instead of using the fixed text.
    pub fn with_model_explanations(mut self, enabled: bool) -> Self {
        self.model_explanations = enabled;
        self
    }

    /// Build the answer. Only cancellation is an error.
    pub fn compose(&self, c: &Composition<'_>, token: &dyn Cancellable) -> QuarryResult<Answer> {
        let hint = &c.question.format_hint;

        let (draft, execution) = match c.chain {
            Some(chain) => {
                if let RepairState::Unavailable { collaborator, reason } = &chain.state {
                    return Ok(self.unavailable(c, collaborator, reason));
                }
                let execution = self
                    .estimator
                    .execution_signal(chain.succeeded(), chain.repairs());
                (self.from_chain(c, chain), Some(execution))
            }
            None => (self.from_fragments(c, token)?, None),
        };

        let retrieval = c
            .route
            .route
            .needs_retrieval()
            .then(|| self.ranker.coverage(&c.question.question, &draft.contributing));
        let completeness = if draft.value.is_some() { 1.0 } else { 0.0 };
        let confidence = self.estimator.estimate(Signals {
            retrieval,
            execution,
            completeness,
            degraded: c.route.degraded,
        });

        let citations = citations(c, &draft.contributing);
        let value = draft.value.unwrap_or_else(|| hint.zero_value());
        let explanation = self.phrase(c, &value, draft.explanation, token)?;
        debug!(
            confidence,
            citations = citations.len(),
            has_value = completeness > 0.0,
            "answer composed"
        );
        Ok(Answer::new(value, confidence, &explanation, citations))
    }

    fn from_chain<'a>(&self, c: &Composition<'a>, chain: &AttemptChain) -> Draft<'a> {
        let contributing = contributing_sources(c);
        if !chain.succeeded() {
            let reason = chain
                .last()
                .and_then(|a| a.outcome.failure_reason())
                .unwrap_or("no query could be synthesized");
            return Draft {
                value: None,
                explanation: explain::exhausted(chain.repairs(), reason),
                contributing,
            };
        }

        let value = chain.rows().and_then(|rows| {
            shape::from_rows(
                &c.question.format_hint,
                rows,
                c.constraints.rank_by(),
                c.constraints.top_n().map(|n| n as usize),
            )
        });
        let explanation = if value.is_some() {
            let tables = c.schema.tables_referenced_in(chain.executed_sql());
            explain::computed(&tables, c.constraints, chain.repairs())
        } else {
            explain::empty_result(c.constraints)
        };
        Draft {
            value,
            explanation,
            contributing,
        }
    }

    fn from_fragments<'a>(
        &self,
        c: &Composition<'a>,
        token: &dyn Cancellable,
    ) -> QuarryResult<Draft<'a>> {
        let hint = &c.question.format_hint;
        if c.fragments.is_empty() {
            return Ok(Draft {
                value: None,
                explanation: explain::not_found(false),
                contributing: Vec::new(),
            });
        }

        if let Some(value) = self.ask_model(c, token)? {
            let contributing: Vec<&RankedFragment> = c
                .fragments
                .iter()
                .filter(|f| mentions(&f.fragment.text, &value))
                .collect();
            let explanation = if contributing.is_empty() {
                explain::unsupported()
            } else {
                let ids: Vec<String> = contributing.iter().map(|f| f.fragment.id()).collect();
                format!("Read from {}.", ids.join(", "))
            };
            return Ok(Draft {
                value: Some(value),
                explanation,
                contributing,
            });
        }

        match extract::best_line(&c.question.question, hint, c.fragments) {
            Some(found) => Ok(Draft {
                explanation: explain::found_in(&found.fragment.fragment.id(), &found.line),
                value: Some(found.value),
                contributing: vec![found.fragment],
            }),
            None => Ok(Draft {
                value: None,
                explanation: explain::not_found(true),
                contributing: Vec::new(),
            }),
        }
    }

    /// Model extraction for retrieval-only answers. `None` when the model is
    /// unavailable or its text does not parse into the hint.
    fn ask_model(&self, c: &Composition<'_>, token: &dyn Cancellable) -> QuarryResult<Option<Value>> {
        if !self.model.is_available() {
            return Ok(None);
        }
        token.checkpoint()?;
        let prompt = answer_prompt(c.question, c.fragments);
        let request = CompletionRequest::new(PromptKind::Answer, prompt).with_max_tokens(self.max_tokens);
        match self.model.complete(&request) {
            Ok(text) => {
                let parsed = shape::from_text(&c.question.format_hint, &text);
                if parsed.is_none() {
                    debug!(reply = %text, "model answer did not parse");
                }
                Ok(parsed)
            }
            Err(e) => {
                warn!(error = %e, "model answer failed, extracting from fragments");
                Ok(None)
            }
        }
    }

    /// Optional model phrasing of the fixed explanation.
    fn phrase(
        &self,
        c: &Composition<'_>,
        value: &Value,
        fixed: String,
        token: &dyn Cancellable,
    ) -> QuarryResult<String> {
        if !self.model_explanations || !self.model.is_available() {
            return Ok(fixed);
        }
        token.checkpoint()?;
        let prompt = format!(
            "Explain in at most two sentences how this answer was obtained.\n\
             Question: {}\nAnswer: {value}\nFacts: {fixed}\nExplanation:",
            c.question.question
        );
        let request = CompletionRequest::new(PromptKind::Explain, prompt).with_max_tokens(self.max_tokens);
        match self.model.complete(&request) {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Ok(fixed),
            Err(e) => {
                debug!(error = %e, "model explanation failed");
                Ok(fixed)
            }
        }
    }

    fn unavailable(&self, c: &Composition<'_>, collaborator: &str, reason: &str) -> Answer {
        let mut answer = Answer::fallback(
            &c.question.format_hint,
            &explain::unavailable(collaborator, reason),
        );
        answer.citations = citations(c, &contributing_sources(c));
        answer
    }
}

/// Fragments whose content fed a constraint.
fn contributing_sources<'a>(c: &Composition<'a>) -> Vec<&'a RankedFragment> {
    c.constraints
        .fragment_sources()
        .iter()
        .filter_map(|id| c.fragments.get(id))
        .collect()
}

/// Contributing fragment ids, then tables of the executed query.
fn citations(c: &Composition<'_>, contributing: &[&RankedFragment]) -> Vec<String> {
    let mut out: Vec<String> = contributing.iter().map(|f| f.fragment.id()).collect();
    if out.is_empty() && c.chain.is_none() {
        // Consulted but unused; still the only source the answer looked at.
        out.extend(c.fragments.iter().take(1).map(|f| f.fragment.id()));
    }
    if let Some(chain) = c.chain {
        out.extend(
            c.schema
                .tables_referenced_in(chain.executed_sql())
                .into_iter()
                .map(str::to_string),
        );
    }
    out
}

/// Whether a fragment's text states any scalar of `value`. Numbers must
/// appear as whole numbers, not as digits inside a date or a longer number.
fn mentions(text: &str, value: &Value) -> bool {
    match value {
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|wanted| shape::numbers(text).any(|found| (found - wanted).abs() < 1e-9)),
        Value::String(s) => !s.is_empty() && text.to_lowercase().contains(&s.to_lowercase()),
        Value::Array(items) => items.iter().any(|v| mentions(text, v)),
        Value::Object(map) => map.values().any(|v| mentions(text, v)),
        _ => false,
    }
}

fn answer_prompt(question: &Question, fragments: &RankedFragmentSet) -> String {
    let context: Vec<String> = fragments
        .iter()
        .take(PROMPT_FRAGMENTS)
        .map(|f| format!("[{}]\n{}", f.fragment.id(), f.fragment.text))
        .collect();
    format!(
        "Answer the question using only the passages below.\n\
         Reply with the answer only, formatted as {}.\n\n{}\n\nQuestion: {}\nAnswer:",
        hint_instructions(&question.format_hint),
        context.join("\n\n"),
        question.question
    )
}

fn hint_instructions(hint: &FormatHint) -> String {
    match hint {
        FormatHint::Int => "a single integer".to_string(),
        FormatHint::Float => "a single number".to_string(),
        FormatHint::Text => "a short phrase".to_string(),
        FormatHint::Object(_) => format!("a JSON object {hint}"),
        FormatHint::List(_) => format!("a JSON array {hint}"),
    }
}
