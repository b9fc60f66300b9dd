//! Span definitions for a question's pipeline execution.

/// Span wrapping one question end to end.
#[macro_export]
macro_rules! question_span {
    ($id:expr) => {
        tracing::info_span!("quarry.question", id = %$id)
    };
}

/// Span wrapping one pipeline stage.
#[macro_export]
macro_rules! stage_span {
    ($stage:expr) => {
        tracing::info_span!("quarry.stage", stage = %$stage)
    };
}

/// Span wrapping one query attempt of the repair chain.
#[macro_export]
macro_rules! attempt_span {
    ($number:expr) => {
        tracing::debug_span!("quarry.attempt", attempt = $number)
    };
}
