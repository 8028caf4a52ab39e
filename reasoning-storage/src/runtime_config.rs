//! Tenant & System Runtime Config (§10.5) - a process-wide, hot-reloadable
//! cache for the external observability sink's connection details, plus the
//! per-tenant `audit_payload_max_chars` override layered under it.
//!
//! Grounded on the `original_source` runtime-config service: one row holds
//! the live sink config, readers get a cheap in-memory clone, and a
//! fingerprint (never the key material) tells callers when a cached
//! external-sink client needs rebuilding.

use crate::repository::ReasoningRepository;
use reasoning_core::{ReasoningResult, SystemRuntimeConfig, TenantId, AUDIT_PAYLOAD_MAX_CHARS_MIN};
use std::sync::Mutex;

/// Falls back to this when a tenant has no [`reasoning_core::TenantRuntimeConfig`]
/// row of its own. Comfortably inside `[AUDIT_PAYLOAD_MAX_CHARS_MIN, MAX]`.
pub const DEFAULT_AUDIT_PAYLOAD_MAX_CHARS: i32 = 20_000;

/// A `Mutex`-guarded cache of [`SystemRuntimeConfig`], refreshed on demand.
///
/// One instance is shared process-wide (constructed once in `reasoning-api`'s
/// app state); every [`crate::trace_sink::TraceSink`] reads through it rather
/// than hitting the database on every trace emission.
pub struct RuntimeConfigCache {
    repo: ReasoningRepository,
    cached: Mutex<SystemRuntimeConfig>,
}

impl RuntimeConfigCache {
    /// Loads the current row; fails if none has been seeded yet.
    pub async fn load(repo: ReasoningRepository) -> ReasoningResult<Self> {
        let config = repo.get_system_runtime_config().await?;
        Ok(Self {
            repo,
            cached: Mutex::new(config),
        })
    }

    /// The last value loaded - does not touch the database.
    pub fn current(&self) -> SystemRuntimeConfig {
        self.cached.lock().expect("runtime config lock poisoned").clone()
    }

    /// Reload from the database unconditionally and replace the cache.
    /// Callers that only care about "has it changed" should compare
    /// [`SystemRuntimeConfig::fingerprint`] against [`Self::current`] first.
    pub async fn refresh(&self) -> ReasoningResult<SystemRuntimeConfig> {
        let fresh = self.repo.get_system_runtime_config().await?;
        *self.cached.lock().expect("runtime config lock poisoned") = fresh.clone();
        Ok(fresh)
    }

    /// The effective `audit_payload_max_chars` for `tenant_id`: the tenant's
    /// own override if one exists, otherwise [`DEFAULT_AUDIT_PAYLOAD_MAX_CHARS`].
    pub async fn audit_payload_max_chars_for(&self, tenant_id: TenantId) -> ReasoningResult<i32> {
        match self.repo.get_tenant_runtime_config(tenant_id).await? {
            Some(cfg) => Ok(cfg.audit_payload_max_chars),
            None => Ok(DEFAULT_AUDIT_PAYLOAD_MAX_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_within_bounds() {
        assert!(DEFAULT_AUDIT_PAYLOAD_MAX_CHARS >= AUDIT_PAYLOAD_MAX_CHARS_MIN);
    }
}
