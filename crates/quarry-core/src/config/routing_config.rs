//! Route classification configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Ask the language model, with the rubric as prompt guidance.
    #[default]
    Model,
    /// Evaluate the rubric locally as keyword rules.
    Rubric,
}

impl std::str::FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "rubric" => Ok(Self::Rubric),
            other => Err(format!("unknown routing mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    pub mode: Option<RoutingMode>,
}

impl RoutingConfig {
    pub fn effective_mode(&self) -> RoutingMode {
        self.mode.unwrap_or_default()
    }
}
