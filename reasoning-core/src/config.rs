//! Environment-driven configuration for the reasoning engine.

use crate::entities::{AUDIT_PAYLOAD_MAX_CHARS_MAX, AUDIT_PAYLOAD_MAX_CHARS_MIN};
use crate::{ConfigError, LlmProvider, ReasoningError, ReasoningResult};
use serde::{Deserialize, Serialize};

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DbConfig {
    pub database_url: String,
    pub pool_size: u32,
}

impl DbConfig {
    /// Read from `REASONING_DATABASE_URL` / `REASONING_DB_POOL_SIZE`.
    pub fn from_env() -> ReasoningResult<Self> {
        let database_url = std::env::var("REASONING_DATABASE_URL").map_err(|_| {
            ReasoningError::Config(ConfigError::MissingRequired {
                field: "REASONING_DATABASE_URL".to_string(),
            })
        })?;
        let pool_size = std::env::var("REASONING_DB_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let config = Self {
            database_url,
            pool_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReasoningResult<()> {
        if self.database_url.trim().is_empty() {
            return Err(ReasoningError::Config(ConfigError::InvalidValue {
                field: "database_url".to_string(),
                value: self.database_url.clone(),
                reason: "must not be empty".to_string(),
            }));
        }
        if self.pool_size == 0 {
            return Err(ReasoningError::Config(ConfigError::InvalidValue {
                field: "pool_size".to_string(),
                value: self.pool_size.to_string(),
                reason: "must be greater than 0".to_string(),
            }));
        }
        Ok(())
    }
}

/// Embedding service settings, used by the Hybrid Retrieval Scorer's
/// primary embedding path before it degrades to the deterministic fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EmbeddingConfig {
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub fallback_dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 5_000,
            fallback_dimensions: 256,
        }
    }
}

impl EmbeddingConfig {
    /// Read from `REASONING_EMBEDDING_ENDPOINT` / `_TIMEOUT_MS` / `_FALLBACK_DIMENSIONS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("REASONING_EMBEDDING_ENDPOINT").ok(),
            timeout_ms: std::env::var("REASONING_EMBEDDING_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            fallback_dimensions: std::env::var("REASONING_EMBEDDING_FALLBACK_DIMENSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fallback_dimensions),
        }
    }
}

/// Default LLM routing used when a tenant has no [`TenantLlmConfig`] yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DefaultLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DefaultLlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Deepseek,
            model: "deepseek-reasoner".to_string(),
            base_url: None,
            timeout_ms: 30_000,
        }
    }
}

impl DefaultLlmConfig {
    /// Read from `REASONING_LLM_PROVIDER` / `_MODEL` / `_BASE_URL` / `_TIMEOUT_MS`.
    pub fn from_env() -> ReasoningResult<Self> {
        let defaults = Self::default();
        let provider = match std::env::var("REASONING_LLM_PROVIDER") {
            Ok(raw) => raw.parse::<LlmProvider>().map_err(|_| {
                ReasoningError::Config(ConfigError::ProviderNotSupported { provider: raw })
            })?,
            Err(_) => defaults.provider,
        };
        Ok(Self {
            provider,
            model: std::env::var("REASONING_LLM_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("REASONING_LLM_BASE_URL").ok(),
            timeout_ms: std::env::var("REASONING_LLM_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
        })
    }
}

/// Langfuse-style external observability sink settings - the *system
/// default* layer of [`crate::SystemRuntimeConfig`], seeded from the
/// environment at boot and then hot-reloadable from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ObservabilitySinkConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for ObservabilitySinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            public_key: None,
            secret_key: None,
        }
    }
}

impl ObservabilitySinkConfig {
    /// Read from `REASONING_SINK_ENABLED` / `_ENDPOINT` / `_PUBLIC_KEY` / `_SECRET_KEY`.
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("REASONING_SINK_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            endpoint: std::env::var("REASONING_SINK_ENDPOINT").ok(),
            public_key: std::env::var("REASONING_SINK_PUBLIC_KEY").ok(),
            secret_key: std::env::var("REASONING_SINK_SECRET_KEY").ok(),
        }
    }
}

/// Master configuration for the reasoning engine. ALL values have sane
/// defaults for local development except the database URL and the secret
/// cipher key, which must be provided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningConfig {
    pub db: DbConfig,
    pub embedding: EmbeddingConfig,
    pub default_llm: DefaultLlmConfig,
    pub sink: ObservabilitySinkConfig,
    /// Process secret for the Secret Cipher (§4.3). Must be at least 16
    /// characters; enforced by `reasoning-crypto`, not re-validated here.
    pub secret_cipher_key: String,
    /// Default for [`crate::TenantRuntimeConfig::audit_payload_max_chars`]
    /// when a tenant has not overridden it.
    pub audit_payload_max_chars: i32,
}

impl ReasoningConfig {
    /// Build the full configuration from the environment.
    pub fn from_env() -> ReasoningResult<Self> {
        let secret_cipher_key = std::env::var("REASONING_SECRET_CIPHER_KEY").map_err(|_| {
            ReasoningError::Config(ConfigError::MissingRequired {
                field: "REASONING_SECRET_CIPHER_KEY".to_string(),
            })
        })?;

        let audit_payload_max_chars = std::env::var("REASONING_AUDIT_PAYLOAD_MAX_CHARS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20_000);

        let config = Self {
            db: DbConfig::from_env()?,
            embedding: EmbeddingConfig::from_env(),
            default_llm: DefaultLlmConfig::from_env()?,
            sink: ObservabilitySinkConfig::from_env(),
            secret_cipher_key,
            audit_payload_max_chars,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReasoningResult<()> {
        self.db.validate()?;

        if self.secret_cipher_key.len() < 16 {
            return Err(ReasoningError::Config(ConfigError::InvalidValue {
                field: "secret_cipher_key".to_string(),
                value: format!("<{} chars>", self.secret_cipher_key.len()),
                reason: "must be at least 16 characters".to_string(),
            }));
        }

        if !(AUDIT_PAYLOAD_MAX_CHARS_MIN..=AUDIT_PAYLOAD_MAX_CHARS_MAX)
            .contains(&self.audit_payload_max_chars)
        {
            return Err(ReasoningError::Config(ConfigError::InvalidValue {
                field: "audit_payload_max_chars".to_string(),
                value: self.audit_payload_max_chars.to_string(),
                reason: format!(
                    "must be between {} and {}",
                    AUDIT_PAYLOAD_MAX_CHARS_MIN, AUDIT_PAYLOAD_MAX_CHARS_MAX
                ),
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RAII helper that sets an env var for the duration of a test and
    /// restores whatever was there before on drop.
    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn db_config_rejects_missing_url() {
        std::env::remove_var("REASONING_DATABASE_URL");
        let result = DbConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn db_config_from_env_reads_pool_size() {
        let _url = EnvVarGuard::set("REASONING_DATABASE_URL", "postgres://localhost/reasoning");
        let _pool = EnvVarGuard::set("REASONING_DB_POOL_SIZE", "25");
        let config = DbConfig::from_env().expect("should parse");
        assert_eq!(config.pool_size, 25);
    }

    #[test]
    fn default_llm_config_rejects_unsupported_provider() {
        let _guard = EnvVarGuard::set("REASONING_LLM_PROVIDER", "not-a-real-provider");
        assert!(DefaultLlmConfig::from_env().is_err());
    }

    #[test]
    fn reasoning_config_validate_rejects_short_secret() {
        let config = ReasoningConfig {
            db: DbConfig {
                database_url: "postgres://localhost/reasoning".to_string(),
                pool_size: 10,
            },
            embedding: EmbeddingConfig::default(),
            default_llm: DefaultLlmConfig::default(),
            sink: ObservabilitySinkConfig::default(),
            secret_cipher_key: "short".to_string(),
            audit_payload_max_chars: 20_000,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reasoning_config_validate_clamps_audit_payload_range() {
        let mut config = ReasoningConfig {
            db: DbConfig {
                database_url: "postgres://localhost/reasoning".to_string(),
                pool_size: 10,
            },
            embedding: EmbeddingConfig::default(),
            default_llm: DefaultLlmConfig::default(),
            sink: ObservabilitySinkConfig::default(),
            secret_cipher_key: "a-sufficiently-long-secret-key".to_string(),
            audit_payload_max_chars: 1_000,
        };
        assert!(config.validate().is_err());
        config.audit_payload_max_chars = 20_000;
        assert!(config.validate().is_ok());
    }
}
