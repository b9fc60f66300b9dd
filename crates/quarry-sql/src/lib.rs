//! # quarry-sql
//!
//! The dataset side of the pipeline:
//!
//! - [`dataset`]: read-only SQLite connection pool, schema introspection and
//!   the Query Runner that classifies every execution into a `QueryOutcome`.
//! - [`synthesizer`]: the Query Synthesizer. Model-generated SQL checked by
//!   [`guard`], hand-authored [`templates`] as the deterministic fallback,
//!   and [`repair`] rewrites applied before any generative repair.

pub mod dataset;
pub mod guard;
pub mod prompts;
pub mod repair;
pub mod synthesizer;
pub mod templates;

pub use dataset::SqliteDataset;
pub use synthesizer::{QuerySynthesizer, SynthesisRequest, SynthesizedQuery, SynthesizerOptions};
pub use templates::Template;
