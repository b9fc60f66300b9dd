//! Top-level Quarry configuration with layered resolution.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    defaults, BatchConfig, ComposerConfig, ConfidenceConfig, DatasetConfig, ModelConfig,
    ModelProvider, RetrievalConfig, RoutingConfig, SynthesisConfig,
};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sections.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`QUARRY_*`)
/// 3. Project config (`quarry.toml` in the working root, or `--config`)
/// 4. User config (`~/.quarry/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuarryConfig {
    pub model: ModelConfig,
    pub retrieval: RetrievalConfig,
    pub dataset: DatasetConfig,
    pub routing: RoutingConfig,
    pub synthesis: SynthesisConfig,
    pub confidence: ConfidenceConfig,
    pub batch: BatchConfig,
    pub composer: ComposerConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Replaces the project `quarry.toml`. Must exist.
    pub config_file: Option<PathBuf>,
    pub offline: bool,
    pub max_concurrency: Option<usize>,
    pub include_trace: Option<bool>,
    pub docs_dir: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
    pub model: Option<String>,
}

impl QuarryConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        match cli_overrides.and_then(|c| c.config_file.as_ref()) {
            Some(explicit) => Self::merge_toml_file(&mut config, explicit)?,
            None => {
                let project_config_path = root.join(defaults::PROJECT_CONFIG_FILE);
                if project_config_path.exists() {
                    Self::merge_toml_file(&mut config, &project_config_path)?;
                }
            }
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config)?;

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &QuarryConfig) -> Result<(), ConfigError> {
        let weights = config.confidence.effective_weights();
        for (field, w) in [
            ("confidence.retrieval_weight", weights.retrieval),
            ("confidence.execution_weight", weights.execution),
            ("confidence.completeness_weight", weights.completeness),
            ("confidence.repair_decay", config.confidence.effective_repair_decay()),
            (
                "confidence.degraded_route_factor",
                config.confidence.effective_degraded_route_factor(),
            ),
            (
                "synthesis.cost_of_goods_ratio",
                config.synthesis.effective_cost_of_goods_ratio(),
            ),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(invalid(field, "must be between 0.0 and 1.0"));
            }
        }
        if weights.retrieval + weights.execution + weights.completeness <= 0.0 {
            return Err(invalid("confidence", "at least one weight must be positive"));
        }
        if config.retrieval.effective_top_k() == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than 0"));
        }
        if !config.retrieval.effective_min_relevance().is_finite() {
            return Err(invalid("retrieval.min_relevance", "must be a finite number"));
        }
        if config.retrieval.effective_max_fragment_chars()
            <= config.retrieval.effective_min_fragment_chars()
        {
            return Err(invalid(
                "retrieval.max_fragment_chars",
                "must be greater than min_fragment_chars",
            ));
        }
        if config.dataset.effective_read_pool_size() == 0 {
            return Err(invalid("dataset.read_pool_size", "must be greater than 0"));
        }
        if config.dataset.effective_query_timeout_ms() == 0 {
            return Err(invalid("dataset.query_timeout_ms", "must be greater than 0"));
        }
        if config.dataset.effective_max_rows() == 0 {
            return Err(invalid("dataset.max_rows", "must be greater than 0"));
        }
        if config.model.effective_timeout_secs() == 0 {
            return Err(invalid("model.timeout_secs", "must be greater than 0"));
        }
        if config.model.effective_max_outstanding() == 0 {
            return Err(invalid("model.max_outstanding", "must be greater than 0"));
        }
        if config.batch.effective_max_concurrency() == 0 {
            return Err(invalid("batch.max_concurrency", "must be greater than 0"));
        }
        if config.batch.effective_question_timeout_secs() == 0 {
            return Err(invalid("batch.question_timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }

    /// Returns the user config path: `~/.quarry/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(defaults::USER_CONFIG_DIR).join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are ignored.
    fn merge_toml_file(config: &mut QuarryConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: QuarryConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `Some` values in `other` win.
    fn merge(base: &mut QuarryConfig, other: &QuarryConfig) {
        // Model
        overlay(&mut base.model.provider, &other.model.provider);
        overlay(&mut base.model.base_url, &other.model.base_url);
        overlay(&mut base.model.model, &other.model.model);
        overlay(&mut base.model.temperature, &other.model.temperature);
        overlay(&mut base.model.max_tokens, &other.model.max_tokens);
        overlay(&mut base.model.timeout_secs, &other.model.timeout_secs);
        overlay(&mut base.model.max_outstanding, &other.model.max_outstanding);

        // Retrieval
        overlay(&mut base.retrieval.docs_dir, &other.retrieval.docs_dir);
        overlay(&mut base.retrieval.top_k, &other.retrieval.top_k);
        overlay(&mut base.retrieval.min_relevance, &other.retrieval.min_relevance);
        overlay(&mut base.retrieval.max_fragment_chars, &other.retrieval.max_fragment_chars);
        overlay(&mut base.retrieval.min_fragment_chars, &other.retrieval.min_fragment_chars);
        overlay(&mut base.retrieval.cache_capacity, &other.retrieval.cache_capacity);

        // Dataset
        overlay(&mut base.dataset.path, &other.dataset.path);
        overlay(&mut base.dataset.read_pool_size, &other.dataset.read_pool_size);
        overlay(&mut base.dataset.query_timeout_ms, &other.dataset.query_timeout_ms);
        overlay(&mut base.dataset.max_rows, &other.dataset.max_rows);

        // Routing / synthesis
        overlay(&mut base.routing.mode, &other.routing.mode);
        overlay(&mut base.synthesis.strategy, &other.synthesis.strategy);
        overlay(
            &mut base.synthesis.cost_of_goods_ratio,
            &other.synthesis.cost_of_goods_ratio,
        );

        // Confidence
        overlay(&mut base.confidence.retrieval_weight, &other.confidence.retrieval_weight);
        overlay(&mut base.confidence.execution_weight, &other.confidence.execution_weight);
        overlay(
            &mut base.confidence.completeness_weight,
            &other.confidence.completeness_weight,
        );
        overlay(&mut base.confidence.repair_decay, &other.confidence.repair_decay);
        overlay(
            &mut base.confidence.degraded_route_factor,
            &other.confidence.degraded_route_factor,
        );

        // Batch / composer
        overlay(&mut base.batch.max_concurrency, &other.batch.max_concurrency);
        overlay(
            &mut base.batch.question_timeout_secs,
            &other.batch.question_timeout_secs,
        );
        overlay(&mut base.batch.include_trace, &other.batch.include_trace);
        overlay(
            &mut base.composer.model_explanations,
            &other.composer.model_explanations,
        );
    }

    /// Apply environment variable overrides.
    /// Pattern: `QUARRY_<SECTION>_<KEY>`, e.g. `QUARRY_BATCH_MAX_CONCURRENCY`.
    /// Unparseable numeric values are ignored; unknown enum names are errors.
    fn apply_env_overrides(config: &mut QuarryConfig) -> Result<(), ConfigError> {
        if let Some(v) = env_enum::<ModelProvider>("QUARRY_MODEL_PROVIDER")? {
            config.model.provider = Some(v);
        }
        if let Ok(val) = std::env::var("QUARRY_MODEL_BASE_URL") {
            config.model.base_url = Some(val);
        }
        if let Ok(val) = std::env::var("QUARRY_MODEL_NAME") {
            config.model.model = Some(val);
        }
        if let Some(v) = env_parsed("QUARRY_MODEL_TIMEOUT_SECS") {
            config.model.timeout_secs = Some(v);
        }
        if let Some(v) = env_parsed("QUARRY_MODEL_MAX_OUTSTANDING") {
            config.model.max_outstanding = Some(v);
        }
        if let Ok(val) = std::env::var("QUARRY_RETRIEVAL_DOCS_DIR") {
            config.retrieval.docs_dir = Some(PathBuf::from(val));
        }
        if let Some(v) = env_parsed("QUARRY_RETRIEVAL_TOP_K") {
            config.retrieval.top_k = Some(v);
        }
        if let Ok(val) = std::env::var("QUARRY_DATASET_PATH") {
            config.dataset.path = Some(PathBuf::from(val));
        }
        if let Some(v) = env_parsed("QUARRY_DATASET_QUERY_TIMEOUT_MS") {
            config.dataset.query_timeout_ms = Some(v);
        }
        if let Some(v) = env_enum("QUARRY_ROUTING_MODE")? {
            config.routing.mode = Some(v);
        }
        if let Some(v) = env_enum("QUARRY_SYNTHESIS_STRATEGY")? {
            config.synthesis.strategy = Some(v);
        }
        if let Some(v) = env_parsed("QUARRY_BATCH_MAX_CONCURRENCY") {
            config.batch.max_concurrency = Some(v);
        }
        if let Some(v) = env_parsed("QUARRY_BATCH_QUESTION_TIMEOUT_SECS") {
            config.batch.question_timeout_secs = Some(v);
        }
        if let Some(v) = env_parsed("QUARRY_BATCH_INCLUDE_TRACE") {
            config.batch.include_trace = Some(v);
        }
        Ok(())
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut QuarryConfig, cli: &CliOverrides) {
        if cli.offline {
            config.model.provider = Some(ModelProvider::Offline);
        }
        if let Some(v) = cli.max_concurrency {
            config.batch.max_concurrency = Some(v);
        }
        if let Some(v) = cli.include_trace {
            config.batch.include_trace = Some(v);
        }
        if let Some(ref v) = cli.docs_dir {
            config.retrieval.docs_dir = Some(v.clone());
        }
        if let Some(ref v) = cli.dataset_path {
            config.dataset.path = Some(v.clone());
        }
        if let Some(ref v) = cli.model {
            config.model.model = Some(v.clone());
        }
    }
}

fn overlay<T: Clone>(base: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        base.clone_from(other);
    }
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_enum<T: FromStr<Err = String>>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|message: String| invalid(key, message.as_str())),
        Err(_) => Ok(None),
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
