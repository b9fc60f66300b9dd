//! # quarry-pipeline
//!
//! The question-answering pipeline:
//!
//! ```text
//! Route Classifier → (Text Ranker) → Constraint Planner
//!     → (Query Synthesizer → Query Runner ⇄ Repair Controller, bounded)
//!     → Answer Composer → Response Validator
//! ```
//!
//! The route picks which stages run ([`plan`]). Each question is one
//! sequential execution owning all of its state; [`batch`] runs many
//! questions concurrently under a limit and a per-question timeout.

pub mod batch;
pub mod composer;
pub mod confidence;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod repair_controller;
pub mod router;
pub mod validator;

pub use batch::{parse_batch, read_batch, write_records, BatchInput, BatchRunner};
pub use composer::{AnswerComposer, Composition};
pub use confidence::{ConfidenceEstimator, Signals};
pub use pipeline::Pipeline;
pub use plan::{Stage, StagePlan};
pub use planner::ConstraintPlanner;
pub use repair_controller::{AttemptChain, RepairController, RepairState};
pub use router::{rubric_route, RouteClassifier, RouteOutcome};
pub use validator::{ResponseValidator, Validated, Verdict};
