//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "QUARRY_LOG";

/// Filter used when `QUARRY_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "quarry=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Initialize the Quarry tracing/logging system.
///
/// Reads `QUARRY_LOG` for per-crate log levels, e.g.
/// `QUARRY_LOG=quarry_pipeline=debug,quarry_sql=warn`.
/// Output goes to stderr; stdout is reserved for answers.
///
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init(),
        };
        // A host application may already own the global subscriber.
        let _ = result;
    });
}
