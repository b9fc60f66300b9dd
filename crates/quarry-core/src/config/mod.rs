//! Configuration system for Quarry.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod batch_config;
pub mod composer_config;
pub mod confidence_config;
pub mod dataset_config;
pub mod defaults;
pub mod model_config;
pub mod quarry_config;
pub mod retrieval_config;
pub mod routing_config;
pub mod synthesis_config;

pub use batch_config::BatchConfig;
pub use composer_config::ComposerConfig;
pub use confidence_config::{ConfidenceConfig, ConfidenceWeights};
pub use dataset_config::DatasetConfig;
pub use model_config::{ModelConfig, ModelProvider};
pub use quarry_config::{CliOverrides, QuarryConfig};
pub use retrieval_config::RetrievalConfig;
pub use routing_config::{RoutingConfig, RoutingMode};
pub use synthesis_config::{SynthesisConfig, SynthesisStrategy};
