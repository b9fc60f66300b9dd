//! Confidence estimator.
//!
//! A weighted mean of the signals that apply to the route, with the weights
//! renormalised over those signals:
//!
//! - retrieval coverage: share of the question's terms found in the
//!   fragments that contributed to the answer (retrieval routes)
//! - execution: 1.0 without repairs, minus `repair_decay` per repair, 0.0
//!   when the chain did not succeed (query routes)
//! - completeness: 1.0 when a value was found, 0.0 otherwise (all routes)
//!
//! A degraded route multiplies the result by `degraded_route_factor`.

use quarry_core::config::{ConfidenceConfig, ConfidenceWeights};

/// Inputs to one estimate. `None` marks a signal the route does not use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub retrieval: Option<f64>,
    pub execution: Option<f64>,
    pub completeness: f64,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceEstimator {
    weights: ConfidenceWeights,
    repair_decay: f64,
    degraded_factor: f64,
}

impl ConfidenceEstimator {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            weights: config.effective_weights(),
            repair_decay: config.effective_repair_decay(),
            degraded_factor: config.effective_degraded_route_factor(),
        }
    }

    /// Execution signal for a chain that succeeded after `repairs` repairs.
    pub fn execution_signal(&self, succeeded: bool, repairs: usize) -> f64 {
        if !succeeded {
            return 0.0;
        }
        (1.0 - self.repair_decay * repairs as f64).clamp(0.0, 1.0)
    }

    pub fn estimate(&self, signals: Signals) -> f64 {
        let parts = [
            signals.retrieval.map(|s| (self.weights.retrieval, s)),
            signals.execution.map(|s| (self.weights.execution, s)),
            Some((self.weights.completeness, signals.completeness)),
        ];
        let (weighted, total) = parts
            .iter()
            .flatten()
            .fold((0.0, 0.0), |(acc, total), (w, s)| {
                (acc + w * sanitize(*s), total + w)
            });
        if total <= 0.0 {
            return 0.0;
        }
        let mut score = weighted / total;
        if signals.degraded {
            score *= self.degraded_factor;
        }
        sanitize(score)
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
