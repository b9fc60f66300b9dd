//! Text Ranker: top-K BM25 retrieval with per-query memoization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use quarry_core::config::RetrievalConfig;
use quarry_core::models::{RankedFragment, RankedFragmentSet};
use quarry_core::tracing::metrics;
use tracing::debug;

use crate::bm25::{Bm25Index, Bm25Params};
use crate::corpus::Corpus;
use crate::tokenizer::{distinct_terms, tokenize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerOptions {
    pub top_k: usize,
    /// Fragments must score strictly above this to be retained.
    pub min_relevance: f64,
    pub cache_capacity: u64,
    pub bm25: Bm25Params,
}

impl Default for RankerOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl RankerOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.effective_top_k(),
            min_relevance: config.effective_min_relevance(),
            cache_capacity: config.effective_cache_capacity(),
            bm25: Bm25Params::default(),
        }
    }
}

/// Ranks corpus fragments against question text.
///
/// Ranking is a pure function of (query tokens, corpus), so results are
/// memoized by a hash of the token sequence. Safe to share across threads.
pub struct TextRanker {
    corpus: Arc<Corpus>,
    index: Bm25Index,
    options: RankerOptions,
    cache: Cache<String, Arc<Vec<(usize, f64)>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TextRanker {
    pub fn new(corpus: Arc<Corpus>, options: RankerOptions) -> Self {
        let index = Bm25Index::build(corpus.fragments(), options.bm25);
        let cache = Cache::builder()
            .max_capacity(options.cache_capacity)
            .build();
        Self {
            corpus,
            index,
            options,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn options(&self) -> &RankerOptions {
        &self.options
    }

    /// Top-K fragments for `question`, scores non-increasing, ties in
    /// corpus order. Empty when nothing clears the relevance threshold.
    pub fn rank(&self, question: &str) -> RankedFragmentSet {
        let tokens = tokenize(question);
        if tokens.is_empty() || self.index.is_empty() {
            return RankedFragmentSet::empty();
        }

        let key = blake3::hash(tokens.join(" ").as_bytes()).to_hex().to_string();
        let positions = match self.cache.get(&key) {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                hit
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let computed = Arc::new(self.select(&tokens));
                self.cache.insert(key, Arc::clone(&computed));
                computed
            }
        };

        let entries: Vec<RankedFragment> = positions
            .iter()
            .filter_map(|&(position, score)| {
                self.corpus.get(position).map(|fragment| RankedFragment {
                    fragment: fragment.clone(),
                    score,
                    position,
                })
            })
            .collect();
        debug!(
            { metrics::FRAGMENTS_RETAINED } = entries.len(),
            { metrics::RANK_CACHE_HIT } = self.hits.load(Ordering::Relaxed),
            "ranked fragments"
        );
        RankedFragmentSet::from_ranked(entries)
    }

    fn select(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .index
            .scores(tokens)
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > self.options.min_relevance)
            .collect();
        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.options.top_k);
        scored
    }

    /// Fraction of the question's distinct content terms that occur in
    /// at least one of `fragments`, in any order. 0 for an empty slice.
    pub fn coverage(&self, question: &str, fragments: &[&RankedFragment]) -> f64 {
        if fragments.is_empty() {
            return 0.0;
        }
        let terms = distinct_terms(question);
        if terms.is_empty() {
            return 1.0;
        }
        let covered = terms
            .iter()
            .filter(|term| fragments.iter().any(|e| self.index.contains(e.position, term)))
            .count();
        covered as f64 / terms.len() as f64
    }

    /// (hits, misses) of the memo since construction.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
