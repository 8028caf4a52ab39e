//! Bearer auth + tenant-header extraction (§6).
//!
//! Every reasoning/tenant-config route requires `X-Tenant-Id` and a bearer
//! token. There is no per-user identity here - the engine is tenant-scoped,
//! not user-scoped - so a valid bearer token only proves "this caller may
//! act for some tenant", and `X-Tenant-Id` says which one.

use reasoning_core::TenantId;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Accepted bearer tokens. Empty means auth is not enforced (local/dev).
    pub tokens: Vec<String>,
}

impl AuthConfig {
    /// `REASONING_API_TOKENS`: comma-separated list of accepted bearer tokens.
    pub fn from_env() -> Self {
        let tokens = std::env::var("REASONING_API_TOKENS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { tokens }
    }
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub tenant_id: TenantId,
}

pub fn authenticate(
    config: &AuthConfig,
    authorization_header: Option<&str>,
    tenant_id_header: Option<&str>,
) -> Result<AuthContext, ApiError> {
    if !config.tokens.is_empty() {
        let token = authorization_header
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing or malformed Authorization header"))?;
        if !config.tokens.iter().any(|t| t == token) {
            return Err(ApiError::unauthorized("invalid bearer token"));
        }
    }

    let tenant_id_str = tenant_id_header
        .ok_or_else(|| ApiError::bad_request("missing X-Tenant-Id header"))?;
    let tenant_id: TenantId = tenant_id_str
        .parse()
        .map_err(|_| ApiError::bad_request("X-Tenant-Id is not a valid identifier"))?;

    Ok(AuthContext { tenant_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasoning_core::EntityIdType;

    #[test]
    fn empty_token_list_skips_bearer_check() {
        let config = AuthConfig { tokens: vec![] };
        let tenant_id = TenantId::now_v7();
        let ctx = authenticate(&config, None, Some(&tenant_id.to_string())).unwrap();
        assert_eq!(ctx.tenant_id, tenant_id);
    }

    #[test]
    fn configured_tokens_reject_missing_header() {
        let config = AuthConfig { tokens: vec!["secret".to_string()] };
        let tenant_id = TenantId::now_v7();
        assert!(authenticate(&config, None, Some(&tenant_id.to_string())).is_err());
    }

    #[test]
    fn configured_tokens_accept_matching_bearer() {
        let config = AuthConfig { tokens: vec!["secret".to_string()] };
        let tenant_id = TenantId::now_v7();
        let ctx = authenticate(&config, Some("Bearer secret"), Some(&tenant_id.to_string())).unwrap();
        assert_eq!(ctx.tenant_id, tenant_id);
    }

    #[test]
    fn missing_tenant_header_is_rejected() {
        let config = AuthConfig { tokens: vec![] };
        assert!(authenticate(&config, None, None).is_err());
    }
}
