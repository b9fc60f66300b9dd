//! Query Synthesizer: question plus constraints in, one SQL string out.

use std::sync::Arc;

use quarry_core::config::{QuarryConfig, SynthesisStrategy};
use quarry_core::errors::SynthesisError;
use quarry_core::models::{ConstraintSet, QueryAttempt, SchemaDescription, SqlOrigin};
use quarry_core::traits::{CompletionRequest, ILanguageModel, PromptKind};
use tracing::{debug, warn};

use crate::templates::Template;
use crate::{guard, prompts, repair};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesizerOptions {
    pub strategy: SynthesisStrategy,
    pub cost_of_goods_ratio: f64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl SynthesizerOptions {
    pub fn from_config(config: &QuarryConfig) -> Self {
        Self {
            strategy: config.synthesis.effective_strategy(),
            cost_of_goods_ratio: config.synthesis.effective_cost_of_goods_ratio(),
            max_tokens: config.model.effective_max_tokens(),
            temperature: config.model.effective_temperature(),
        }
    }
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self::from_config(&QuarryConfig::default())
    }
}

/// Everything synthesis reads for one question.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub question: &'a str,
    pub constraints: &'a ConstraintSet,
    pub schema: &'a SchemaDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedQuery {
    pub sql: String,
    pub origin: SqlOrigin,
}

impl SynthesizedQuery {
    fn template(template: Template, request: &SynthesisRequest<'_>, ratio: f64) -> Self {
        Self {
            sql: template.render(request.constraints, ratio),
            origin: SqlOrigin::Template(template.name().to_string()),
        }
    }
}

/// Result of asking the model for SQL.
enum Generated {
    Sql(String),
    /// Failed the guard; `sql` is empty when the reply held no query.
    Rejected { sql: String, reason: String },
    Unavailable,
}

pub struct QuerySynthesizer {
    model: Arc<dyn ILanguageModel>,
    options: SynthesizerOptions,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn ILanguageModel>, options: SynthesizerOptions) -> Self {
        Self { model, options }
    }

    pub fn options(&self) -> &SynthesizerOptions {
        &self.options
    }

    /// Produce the initial query.
    ///
    /// Generated SQL that fails the guard, or drops a constraint while a
    /// template covers the question, is replaced by the template.
    pub fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<SynthesizedQuery, SynthesisError> {
        let template = Template::select(request.question, request.constraints, request.schema);
        if self.options.strategy == SynthesisStrategy::TemplateFirst {
            if let Some(t) = template {
                return Ok(SynthesizedQuery::template(t, request, self.options.cost_of_goods_ratio));
            }
        }

        let prompt = prompts::sql_prompt(request.question, request.constraints, request.schema);
        let generated = self.generate(PromptKind::Sql, prompt, request.schema);
        match generated {
            Generated::Sql(sql) => {
                let gaps = guard::missing_constraints(&sql, request.constraints);
                match (gaps.is_empty(), template) {
                    (true, _) => Ok(SynthesizedQuery {
                        sql,
                        origin: SqlOrigin::Generated,
                    }),
                    (false, Some(t)) => {
                        debug!(template = t.name(), ?gaps, "generated query dropped constraints");
                        Ok(SynthesizedQuery::template(t, request, self.options.cost_of_goods_ratio))
                    }
                    (false, None) => {
                        warn!(?gaps, "generated query dropped constraints and no template matches");
                        Ok(SynthesizedQuery {
                            sql,
                            origin: SqlOrigin::Generated,
                        })
                    }
                }
            }
            Generated::Rejected { sql, reason } => match template {
                Some(t) => Ok(SynthesizedQuery::template(t, request, self.options.cost_of_goods_ratio)),
                None => Err(SynthesisError::Malformed { sql, reason }),
            },
            Generated::Unavailable => match template {
                Some(t) => Ok(SynthesizedQuery::template(t, request, self.options.cost_of_goods_ratio)),
                None => Err(SynthesisError::BackendUnavailable {
                    collaborator: self.model.name().to_string(),
                }),
            },
        }
    }

    /// Produce a different query for a failed attempt.
    ///
    /// Order: schema-aware rewrite rules, then a generative repair, then a
    /// template that differs from the failed text. Never returns the failed
    /// query unchanged. A new query that fails the guard is `Malformed` so
    /// the caller can spend another repair on it.
    pub fn repair(
        &self,
        request: &SynthesisRequest<'_>,
        failed: &QueryAttempt,
    ) -> Result<SynthesizedQuery, SynthesisError> {
        let reason = failed
            .outcome
            .failure_reason()
            .unwrap_or("query returned no rows");

        if let Some(sql) = repair::rule_repair(&failed.sql, request.schema) {
            if guard::check_well_formed(&sql, request.schema).is_ok() {
                debug!(attempt = failed.number, "rule repair applied");
                return Ok(SynthesizedQuery {
                    sql,
                    origin: SqlOrigin::RuleRepair,
                });
            }
        }

        let prompt = prompts::repair_prompt(
            request.question,
            request.constraints,
            request.schema,
            &failed.sql,
            reason,
        );
        let mut rejected = None;
        let model_down = match self.generate(PromptKind::Repair, prompt, request.schema) {
            Generated::Sql(sql) if !same_query(&sql, &failed.sql) => {
                return Ok(SynthesizedQuery {
                    sql,
                    origin: SqlOrigin::GeneratedRepair,
                });
            }
            Generated::Sql(_) => {
                debug!(attempt = failed.number, "generative repair repeated the failed query");
                false
            }
            Generated::Rejected { sql, reason } => {
                debug!(attempt = failed.number, reason = %reason, "generative repair rejected");
                if !same_query(&sql, &failed.sql) {
                    rejected = Some(SynthesisError::Malformed { sql, reason });
                }
                false
            }
            Generated::Unavailable => true,
        };

        if let Some(t) = Template::select(request.question, request.constraints, request.schema) {
            let candidate = SynthesizedQuery::template(t, request, self.options.cost_of_goods_ratio);
            if !same_query(&candidate.sql, &failed.sql) {
                return Ok(candidate);
            }
        }

        match (model_down, rejected) {
            (true, _) => Err(SynthesisError::BackendUnavailable {
                collaborator: self.model.name().to_string(),
            }),
            (false, Some(malformed)) => Err(malformed),
            (false, None) => Err(SynthesisError::Unchanged),
        }
    }

    fn generate(&self, kind: PromptKind, prompt: String, schema: &SchemaDescription) -> Generated {
        if !self.model.is_available() {
            return Generated::Unavailable;
        }
        let request = CompletionRequest::new(kind, prompt)
            .with_max_tokens(self.options.max_tokens)
            .with_temperature(self.options.temperature);
        let text = match self.model.complete(&request) {
            Ok(text) => text,
            Err(e) if e.is_unavailable() => {
                warn!(model = self.model.name(), error = %e, "model unavailable during synthesis");
                return Generated::Unavailable;
            }
            Err(e) => {
                return Generated::Rejected {
                    sql: String::new(),
                    reason: e.to_string(),
                }
            }
        };
        let Some(sql) = guard::extract_sql(&text) else {
            return Generated::Rejected {
                sql: String::new(),
                reason: "model reply contained no query".to_string(),
            };
        };
        match guard::check_well_formed(&sql, schema) {
            Ok(()) => Generated::Sql(sql),
            Err(reason) => Generated::Rejected { sql, reason },
        }
    }
}

/// Whitespace- and case-insensitive comparison of query text.
fn same_query(a: &str, b: &str) -> bool {
    let norm = |s: &str| {
        guard::strip_fences(s)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase()
    };
    norm(a) == norm(b)
}
