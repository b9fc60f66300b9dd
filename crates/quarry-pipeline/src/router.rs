//! Route Classifier.
//!
//! Model mode asks the language model with the decision rubric in the
//! prompt; rubric mode evaluates the same rubric locally. A failed or
//! unparseable classification falls back to hybrid and is flagged as
//! degraded so confidence can be lowered.

use std::sync::{Arc, LazyLock};

use quarry_core::config::{QuarryConfig, RoutingMode};
use quarry_core::models::RouteDecision;
use quarry_core::traits::{CompletionRequest, ILanguageModel, PromptKind};
use regex::Regex;
use tracing::{debug, warn};

/// Terms that point at the document corpus.
const RETRIEVAL_TERMS: &[&str] = &[
    "according to",
    "as defined",
    "calendar",
    "campaign",
    "definition",
    "defined",
    "docs",
    "document",
    "kpi",
    "marketing",
    "policy",
    "return window",
];

/// Terms that point at aggregates over transactional data.
const QUERY_TERMS: &[&str] = &[
    "all-time",
    "aov",
    "average",
    "count",
    "highest",
    "how many",
    "lowest",
    "margin",
    "orders",
    "quantity",
    "revenue",
    "sold",
    "sum(",
    "top ",
    "total",
];

/// A quoted name carrying a year, e.g. `'Summer Beverages 1997'`: a named
/// period whose dates live in the documents.
static NAMED_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"][^'"]*\b(?:19|20)\d{2}\b[^'"]*['"]"#).expect("named period regex is valid")
});

const RUBRIC: &str = "\
- Mentions of policies, definitions, campaigns, calendars or documents need retrieval.
- Aggregates, counts, top-N or totals over orders, products, customers or revenue need a query.
- Questions that need both are hybrid.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub route: RouteDecision,
    /// Classification failed and the route is the hybrid default.
    pub degraded: bool,
}

impl RouteOutcome {
    fn decided(route: RouteDecision) -> Self {
        Self {
            route,
            degraded: false,
        }
    }

    fn fallback() -> Self {
        Self {
            route: RouteDecision::Hybrid,
            degraded: true,
        }
    }
}

pub struct RouteClassifier {
    model: Arc<dyn ILanguageModel>,
    mode: RoutingMode,
    max_tokens: u32,
}

impl RouteClassifier {
    pub fn new(model: Arc<dyn ILanguageModel>, mode: RoutingMode) -> Self {
        Self {
            model,
            mode,
            max_tokens: 16,
        }
    }

    pub fn from_config(model: Arc<dyn ILanguageModel>, config: &QuarryConfig) -> Self {
        Self::new(model, config.routing.effective_mode())
    }

    /// Whether routing asks the model or applies the keyword rubric.
    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Always returns one of the three routes.
    pub fn classify(&self, question: &str) -> RouteOutcome {
        match self.mode {
            RoutingMode::Rubric => RouteOutcome::decided(rubric_route(question)),
            RoutingMode::Model => self.classify_with_model(question),
        }
    }

    fn classify_with_model(&self, question: &str) -> RouteOutcome {
        let prompt = format!(
            "Classify the analytics question into exactly one route: rag, sql or hybrid.\n\
             Rubric:\n{RUBRIC}\n\nQuestion: {question}\nRoute:"
        );
        let request = CompletionRequest::new(PromptKind::Route, prompt).with_max_tokens(self.max_tokens);
        match self.model.complete(&request) {
            Ok(text) => match RouteDecision::parse_label(&text) {
                Some(route) => {
                    debug!(route = route.as_str(), "route classified");
                    RouteOutcome::decided(route)
                }
                None => {
                    warn!(reply = %text.trim(), "unparseable route label, defaulting to hybrid");
                    RouteOutcome::fallback()
                }
            },
            Err(e) => {
                warn!(error = %e, "route classification failed, defaulting to hybrid");
                RouteOutcome::fallback()
            }
        }
    }
}

/// The decision rubric as keyword rules. Neither side matching is hybrid.
pub fn rubric_route(question: &str) -> RouteDecision {
    let q = question.to_ascii_lowercase();
    let retrieval = RETRIEVAL_TERMS.iter().any(|t| q.contains(t)) || NAMED_PERIOD.is_match(&q);
    let query = QUERY_TERMS.iter().any(|t| q.contains(t));
    match (retrieval, query) {
        (true, false) => RouteDecision::RetrievalOnly,
        (false, true) => RouteDecision::QueryOnly,
        _ => RouteDecision::Hybrid,
    }
}
