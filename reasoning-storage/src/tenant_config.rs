//! Tenant Config Resolver (§4.7) - reads and writes per-tenant LLM routing,
//! encrypting API keys at rest and masking them on the way back out.
//!
//! Switching the active provider never discards a key entered for a
//! different provider: ciphertexts are kept in a per-provider map, and a
//! switch without a fresh key is only accepted when a ciphertext already
//! exists for the target provider.

use chrono::Utc;
use reasoning_core::{
    LlmProvider, ReasoningError, ReasoningResult, TenantId, TenantLlmConfig, ValidationError,
};
use std::collections::HashMap;

use crate::repository::ReasoningRepository;

/// Read-facing view of a tenant's LLM config: ciphertexts are never
/// returned to callers, only masked previews.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantLlmConfigView {
    pub tenant_id: TenantId,
    pub provider: LlmProvider,
    pub model: String,
    pub fallback_provider: Option<LlmProvider>,
    pub fallback_model: Option<String>,
    pub masked_api_key_by_provider: HashMap<String, String>,
    pub created_at: reasoning_core::Timestamp,
    pub updated_at: reasoning_core::Timestamp,
}

/// A caller-supplied update. `api_key` is `None` when the tenant is only
/// switching provider/model and expects the previously stored key to carry
/// over for that provider.
#[derive(Debug, Clone)]
pub struct TenantLlmConfigUpdate {
    pub provider: LlmProvider,
    pub model: String,
    pub fallback_provider: Option<LlmProvider>,
    pub fallback_model: Option<String>,
    pub api_key: Option<String>,
}

pub struct TenantConfigResolver {
    repo: ReasoningRepository,
    secret_cipher_key: String,
}

impl TenantConfigResolver {
    pub fn new(repo: ReasoningRepository, secret_cipher_key: String) -> Self {
        Self {
            repo,
            secret_cipher_key,
        }
    }

    pub async fn get(&self, tenant_id: TenantId) -> ReasoningResult<Option<TenantLlmConfigView>> {
        match self.repo.get_tenant_llm_config(tenant_id).await? {
            Some(config) => Ok(Some(self.to_view(&config)?)),
            None => Ok(None),
        }
    }

    /// The config actually used to route a run: the full decrypted routing
    /// metadata, not the masked view. Internal to `reasoning-storage` /
    /// `reasoning-api` - never serialized to a client response.
    pub async fn resolve_for_routing(
        &self,
        tenant_id: TenantId,
    ) -> ReasoningResult<Option<(TenantLlmConfig, String)>> {
        let Some(config) = self.repo.get_tenant_llm_config(tenant_id).await? else {
            return Ok(None);
        };
        let active_cipher = config
            .api_key_cipher_by_provider
            .get(&config.provider.to_string())
            .cloned()
            .ok_or_else(|| {
                ReasoningError::Validation(ValidationError::ConstraintViolation {
                    constraint: "tenant_llm_config.api_key_cipher_by_provider".to_string(),
                    reason: format!("no API key on file for provider {}", config.provider),
                })
            })?;
        let api_key = reasoning_crypto::decrypt(&self.secret_cipher_key, &active_cipher)?;
        Ok(Some((config, api_key)))
    }

    pub async fn put(
        &self,
        tenant_id: TenantId,
        update: TenantLlmConfigUpdate,
    ) -> ReasoningResult<TenantLlmConfigView> {
        let existing = self.repo.get_tenant_llm_config(tenant_id).await?;
        let mut ciphers = existing
            .as_ref()
            .map(|c| c.api_key_cipher_by_provider.clone())
            .unwrap_or_default();

        let provider_key = update.provider.to_string();
        match &update.api_key {
            Some(plaintext) => {
                let cipher = reasoning_crypto::encrypt(&self.secret_cipher_key, plaintext)?;
                ciphers.insert(provider_key.clone(), cipher);
            }
            None if !ciphers.contains_key(&provider_key) => {
                return Err(ReasoningError::Validation(ValidationError::RequiredFieldMissing {
                    field: format!("api_key (no existing key on file for provider {})", update.provider),
                }));
            }
            None => {}
        }

        let now = Utc::now();
        let config = TenantLlmConfig {
            tenant_id,
            provider: update.provider,
            model: update.model,
            fallback_provider: update.fallback_provider,
            fallback_model: update.fallback_model,
            api_key_cipher_by_provider: ciphers,
            extra_json: existing.as_ref().and_then(|c| c.extra_json.clone()),
            created_at: existing.as_ref().map(|c| c.created_at).unwrap_or(now),
            updated_at: now,
        };

        let saved = self.repo.upsert_tenant_llm_config(&config).await?;
        self.to_view(&saved)
    }

    fn to_view(&self, config: &TenantLlmConfig) -> ReasoningResult<TenantLlmConfigView> {
        let mut masked = HashMap::with_capacity(config.api_key_cipher_by_provider.len());
        for (provider, cipher) in &config.api_key_cipher_by_provider {
            let plaintext = reasoning_crypto::decrypt(&self.secret_cipher_key, cipher)?;
            masked.insert(provider.clone(), reasoning_crypto::mask(&plaintext));
        }

        Ok(TenantLlmConfigView {
            tenant_id: config.tenant_id,
            provider: config.provider.clone(),
            model: config.model.clone(),
            fallback_provider: config.fallback_provider.clone(),
            fallback_model: config.fallback_model.clone(),
            masked_api_key_by_provider: masked,
            created_at: config.created_at,
            updated_at: config.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_without_api_key_requires_existing_cipher() {
        let mut ciphers = HashMap::new();
        ciphers.insert("deepseek".to_string(), "ct".to_string());
        let existing = TenantLlmConfig {
            tenant_id: TenantId::now_v7(),
            provider: LlmProvider::Deepseek,
            model: "deepseek-reasoner".to_string(),
            fallback_provider: None,
            fallback_model: None,
            api_key_cipher_by_provider: ciphers,
            extra_json: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // Switching to qwen without a key and no prior qwen ciphertext
        // should be rejected - exercised at the unit level against the
        // plain data shape, the resolver's I/O path is covered by
        // reasoning-storage's integration suite.
        assert!(!existing.has_key_for(&LlmProvider::Qwen));
    }
}
