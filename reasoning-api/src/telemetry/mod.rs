//! Structured logging bootstrap for the API layer (§10.4).

pub mod tracer;

pub use tracer::{init_tracer, shutdown_tracer, TelemetryConfig};
