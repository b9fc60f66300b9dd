//! Okapi BM25 index over the corpus fragments.

use std::collections::HashMap;

use quarry_core::models::Fragment;

use crate::tokenizer::tokenize;

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization.
    pub b: f64,
    /// Negative idf values are replaced by `epsilon * mean idf`.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Precomputed term statistics. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    /// Term frequencies per fragment, in corpus order.
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f64>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build(fragments: &[Fragment], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(fragments.len());
        let mut doc_lens = Vec::with_capacity(fragments.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for fragment in fragments {
            let tokens = tokenize(&fragment.text);
            doc_lens.push(tokens.len() as f64);
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = fragments.len() as f64;
        let avg_doc_len = if fragments.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f64>() / n
        };

        let mut idf: HashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, ((n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();
        if !idf.is_empty() {
            // Summed in term order so the floor does not depend on hash order.
            let mut by_term: Vec<(&String, f64)> = idf.iter().map(|(t, v)| (t, *v)).collect();
            by_term.sort_unstable_by(|a, b| a.0.cmp(b.0));
            let mean = by_term.iter().map(|(_, v)| v).sum::<f64>() / by_term.len() as f64;
            let floor = params.epsilon * mean;
            for value in idf.values_mut() {
                if *value < 0.0 {
                    *value = floor;
                }
            }
        }

        Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// Score of every fragment against `query_terms`, in corpus order.
    /// Repeated query terms contribute once per occurrence.
    pub fn scores(&self, query_terms: &[String]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        let mut scores = vec![0.0; self.term_freqs.len()];
        if self.avg_doc_len == 0.0 {
            return scores;
        }
        for term in query_terms {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (i, tf) in self.term_freqs.iter().enumerate() {
                let Some(&f) = tf.get(term) else {
                    continue;
                };
                let f = f64::from(f);
                let norm = 1.0 - b + b * self.doc_lens[i] / self.avg_doc_len;
                scores[i] += idf * f * (k1 + 1.0) / (f + k1 * norm);
            }
        }
        scores
    }

    /// Whether `term` occurs in fragment `position`.
    pub fn contains(&self, position: usize, term: &str) -> bool {
        self.term_freqs
            .get(position)
            .is_some_and(|tf| tf.contains_key(term))
    }
}
