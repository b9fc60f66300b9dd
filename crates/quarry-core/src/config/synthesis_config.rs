//! Query synthesis configuration.

use serde::{Deserialize, Serialize};

use crate::constants::COST_OF_GOODS_RATIO;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// Model-generated SQL; templates only when generation fails.
    #[default]
    GenerativeFirst,
    /// Templates for recognized questions; model for the rest.
    TemplateFirst,
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "generative_first" => Ok(Self::GenerativeFirst),
            "template_first" => Ok(Self::TemplateFirst),
            other => Err(format!("unknown synthesis strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisConfig {
    pub strategy: Option<SynthesisStrategy>,
    /// Fraction of unit price treated as cost. Default: 0.7.
    pub cost_of_goods_ratio: Option<f64>,
}

impl SynthesisConfig {
    pub fn effective_strategy(&self) -> SynthesisStrategy {
        self.strategy.unwrap_or_default()
    }

    pub fn effective_cost_of_goods_ratio(&self) -> f64 {
        self.cost_of_goods_ratio.unwrap_or(COST_OF_GOODS_RATIO)
    }
}
