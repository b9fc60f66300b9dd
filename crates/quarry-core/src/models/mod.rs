//! Domain models flowing through the pipeline.

pub mod answer;
pub mod constraint;
pub mod format_hint;
pub mod fragment;
pub mod query;
pub mod question;
pub mod route;
pub mod schema;

pub use answer::{bound_explanation, Answer, AnswerRecord, TraceStep};
pub use constraint::{Constraint, ConstraintKey, ConstraintSet, ConstraintSource, ConstraintValue};
pub use format_hint::{float_value, FieldSpec, FieldType, FormatHint};
pub use fragment::{Fragment, RankedFragment, RankedFragmentSet};
pub use query::{OutcomeKind, QueryAttempt, QueryOutcome, RowSet, SqlOrigin};
pub use question::Question;
pub use route::RouteDecision;
pub use schema::{ColumnSchema, SchemaDescription, TableSchema};
