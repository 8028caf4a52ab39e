//! Structured logging bootstrap (§10.4).
//!
//! Request-tracing middleware and metrics export are explicitly out of
//! scope (§1) - those live in the sibling services this engine sits behind.
//! What stays is the ambient logging stack every service in this codebase
//! carries: `tracing` + `tracing-subscriber` with an env-filter and JSON
//! output suitable for log aggregation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ApiResult;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("REASONING_SERVICE_NAME")
                .unwrap_or_else(|_| "reasoning-api".to_string()),
            environment: std::env::var("REASONING_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }
}

/// Installs a global `tracing` subscriber. JSON formatting in any
/// environment other than `development`, human-readable otherwise.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.environment == "development" {
        registry.with(fmt::layer().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    }

    tracing::info!(service = %config.service_name, env = %config.environment, "telemetry initialized");
    Ok(())
}

pub fn shutdown_tracer() {
    // Nothing to flush: no external exporter is wired up (see module docs).
}
