//! Corpus and ranking configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory of markdown documents. Default: `docs`.
    pub docs_dir: Option<PathBuf>,
    /// Fragments retained per question. Default: 3.
    pub top_k: Option<usize>,
    /// Scores must be strictly greater than this to be retained. Default: 0.0.
    pub min_relevance: Option<f64>,
    /// Longer sections are split on whitespace. Default: 1200.
    pub max_fragment_chars: Option<usize>,
    /// Sections this short or shorter are dropped. Default: 20.
    pub min_fragment_chars: Option<usize>,
    /// Ranker memo entries. Default: 1024.
    pub cache_capacity: Option<u64>,
}

impl RetrievalConfig {
    pub fn effective_docs_dir(&self) -> PathBuf {
        self.docs_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_DOCS_DIR))
    }

    pub fn effective_top_k(&self) -> usize {
        self.top_k.unwrap_or(defaults::DEFAULT_TOP_K)
    }

    pub fn effective_min_relevance(&self) -> f64 {
        self.min_relevance.unwrap_or(defaults::DEFAULT_MIN_RELEVANCE)
    }

    pub fn effective_max_fragment_chars(&self) -> usize {
        self.max_fragment_chars
            .unwrap_or(defaults::DEFAULT_MAX_FRAGMENT_CHARS)
    }

    pub fn effective_min_fragment_chars(&self) -> usize {
        self.min_fragment_chars
            .unwrap_or(defaults::DEFAULT_MIN_FRAGMENT_CHARS)
    }

    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity
            .unwrap_or(defaults::DEFAULT_RANK_CACHE_CAPACITY)
    }
}
