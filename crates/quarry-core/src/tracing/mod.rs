//! Observability for Quarry.
//! `tracing` with `EnvFilter` from `QUARRY_LOG`, span macros and metric field names.

pub mod metrics;
pub mod setup;
pub mod spans;

pub use setup::{init_tracing, LogFormat};
