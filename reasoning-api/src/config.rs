//! API-layer configuration: CORS and rate limiting.
//!
//! Everything the reasoning engine itself needs (database, embedding
//! endpoint, default LLM routing, observability sink, secret cipher key) is
//! [`reasoning_core::ReasoningConfig`] - this struct only covers settings
//! specific to sitting behind HTTP.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub cors_max_age_secs: u64,

    pub rate_limit_enabled: bool,
    pub rate_limit_unauthenticated: u32,
    pub rate_limit_authenticated: u32,
    pub rate_limit_window: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            rate_limit_enabled: true,
            rate_limit_unauthenticated: 60,
            rate_limit_authenticated: 600,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    /// Environment variables:
    /// - `REASONING_API_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `REASONING_API_CORS_ALLOW_CREDENTIALS`: "true"/"false" (default false)
    /// - `REASONING_API_CORS_MAX_AGE_SECS` (default 86400)
    /// - `REASONING_API_RATE_LIMIT_ENABLED`: "true"/"false" (default true)
    /// - `REASONING_API_RATE_LIMIT_UNAUTHENTICATED` requests/minute per IP (default 60)
    /// - `REASONING_API_RATE_LIMIT_AUTHENTICATED` requests/minute per tenant (default 600)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("REASONING_API_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("REASONING_API_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("REASONING_API_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let rate_limit_enabled = std::env::var("REASONING_API_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| !s.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let rate_limit_unauthenticated = std::env::var("REASONING_API_RATE_LIMIT_UNAUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let rate_limit_authenticated = std::env::var("REASONING_API_RATE_LIMIT_AUTHENTICATED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            rate_limit_enabled,
            rate_limit_unauthenticated,
            rate_limit_authenticated,
            rate_limit_window: Duration::from_secs(60),
        }
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

/// HTTP settings for the two external collaborators the graph calls out
/// to: the ontology/graph-tools service and the data service. Bit-level
/// wire details of both are out of scope (§1) - this only covers where to
/// reach them.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    pub graph_tools_base_url: String,
    pub graph_tools_api_key: String,
    pub graph_tools_timeout_ms: u64,

    pub data_service_base_url: String,
    pub data_service_api_key: String,
    pub data_service_timeout_ms: u64,
}

impl CollaboratorConfig {
    /// Environment variables:
    /// - `REASONING_GRAPH_TOOLS_BASE_URL` / `_API_KEY` / `_TIMEOUT_MS` (default 10000)
    /// - `REASONING_DATA_SERVICE_BASE_URL` / `_API_KEY` / `_TIMEOUT_MS` (default 10000)
    pub fn from_env() -> reasoning_core::ReasoningResult<Self> {
        use reasoning_core::{ConfigError, ReasoningError};

        let required = |name: &str| {
            std::env::var(name).map_err(|_| {
                ReasoningError::Config(ConfigError::MissingRequired { field: name.to_string() })
            })
        };
        let timeout_ms = |name: &str, default: u64| {
            std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
        };

        Ok(Self {
            graph_tools_base_url: required("REASONING_GRAPH_TOOLS_BASE_URL")?,
            graph_tools_api_key: std::env::var("REASONING_GRAPH_TOOLS_API_KEY").unwrap_or_default(),
            graph_tools_timeout_ms: timeout_ms("REASONING_GRAPH_TOOLS_TIMEOUT_MS", 10_000),

            data_service_base_url: required("REASONING_DATA_SERVICE_BASE_URL")?,
            data_service_api_key: std::env::var("REASONING_DATA_SERVICE_API_KEY").unwrap_or_default(),
            data_service_timeout_ms: timeout_ms("REASONING_DATA_SERVICE_TIMEOUT_MS", 10_000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_any_origin() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.example"));
    }

    #[test]
    fn configured_origins_are_exact_match() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec!["https://tenant.example".to_string()];
        assert!(config.is_origin_allowed("https://tenant.example"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }
}
