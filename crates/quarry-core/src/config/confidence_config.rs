//! Confidence estimator configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEGRADED_ROUTE_FACTOR, EXECUTION_SUCCESS_WEIGHT, REPAIR_DECAY, RESULT_COMPLETENESS_WEIGHT,
    RETRIEVAL_COVERAGE_WEIGHT,
};

/// Resolved signal weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceWeights {
    pub retrieval: f64,
    pub execution: f64,
    pub completeness: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            retrieval: RETRIEVAL_COVERAGE_WEIGHT,
            execution: EXECUTION_SUCCESS_WEIGHT,
            completeness: RESULT_COMPLETENESS_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub retrieval_weight: Option<f64>,
    pub execution_weight: Option<f64>,
    pub completeness_weight: Option<f64>,
    /// Execution signal lost per repair. Default: 0.25.
    pub repair_decay: Option<f64>,
    /// Multiplier when routing fell back to hybrid. Default: 0.8.
    pub degraded_route_factor: Option<f64>,
}

impl ConfidenceConfig {
    pub fn effective_weights(&self) -> ConfidenceWeights {
        let d = ConfidenceWeights::default();
        ConfidenceWeights {
            retrieval: self.retrieval_weight.unwrap_or(d.retrieval),
            execution: self.execution_weight.unwrap_or(d.execution),
            completeness: self.completeness_weight.unwrap_or(d.completeness),
        }
    }

    pub fn effective_repair_decay(&self) -> f64 {
        self.repair_decay.unwrap_or(REPAIR_DECAY)
    }

    pub fn effective_degraded_route_factor(&self) -> f64 {
        self.degraded_route_factor.unwrap_or(DEGRADED_ROUTE_FACTOR)
    }
}
