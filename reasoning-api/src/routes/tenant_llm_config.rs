//! Tenant LLM config surface (§6, ambient — §10.3):
//! `/api/v1/tenants/{tenant_id}/llm-config`.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use reasoning_core::{LlmProvider, TenantId};
use reasoning_llm::OpenAiCompatibleClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ok_envelope, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::AppState;
use reasoning_storage::TenantLlmConfigUpdate;

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PutLlmConfigRequest {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub fallback_provider: Option<LlmProvider>,
    #[serde(default)]
    pub fallback_model: Option<String>,
}

fn view_to_json(view: &reasoning_storage::TenantLlmConfigView) -> Value {
    json!({
        "provider": view.provider,
        "model": view.model,
        "fallback_provider": view.fallback_provider,
        "fallback_model": view.fallback_model,
        "api_key_masked_by_provider": view.masked_api_key_by_provider,
        "extra_json": Value::Null,
    })
}

/// GET `/` - the tenant's current LLM routing config.
async fn get_llm_config(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
    Path(tenant_id): Path<TenantId>,
) -> ApiResult<Json<Value>> {
    let view = state.tenant_config.get(tenant_id).await?;
    Ok(ok_envelope(
        view.as_ref().map(view_to_json).unwrap_or(Value::Null),
        None,
    ))
}

/// PUT `/` - create or update the tenant's LLM routing config.
async fn put_llm_config(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
    Path(tenant_id): Path<TenantId>,
    Json(body): Json<PutLlmConfigRequest>,
) -> ApiResult<Json<Value>> {
    let update = TenantLlmConfigUpdate {
        provider: body.provider,
        model: body.model,
        fallback_provider: body.fallback_provider,
        fallback_model: body.fallback_model,
        api_key: body.api_key,
    };
    let view = state.tenant_config.put(tenant_id, update).await?;
    Ok(ok_envelope(view_to_json(&view), None))
}

/// POST `/verify` - build the tenant's client and probe it with a minimal
/// chat call; does not persist anything.
async fn verify_llm_config(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
    Path(tenant_id): Path<TenantId>,
) -> ApiResult<Json<Value>> {
    let Some((config, api_key)) = state.tenant_config.resolve_for_routing(tenant_id).await? else {
        return Ok(ok_envelope(
            json!({ "provider": Value::Null, "ok": false, "message": "no llm config on file for this tenant" }),
            None,
        ));
    };

    let base_url = config.provider.default_base_url().map(str::to_string);
    let Some(base_url) = base_url else {
        return Ok(ok_envelope(
            json!({
                "provider": config.provider,
                "ok": false,
                "message": "provider has no default base_url; cannot verify a generic endpoint without one",
            }),
            None,
        ));
    };

    let probe = match OpenAiCompatibleClient::new(
        config.provider.to_string(),
        base_url,
        api_key,
        state.reasoning_config.default_llm.timeout_ms,
    ) {
        Ok(client) => {
            let messages = [reasoning_llm::ChatMessage::user("respond with the single word: ok")];
            client.chat_completion(&config.model, &messages).await.map(|_| ())
        }
        Err(e) => Err(e),
    };

    match probe {
        Ok(_) => Ok(ok_envelope(
            json!({ "provider": config.provider, "ok": true, "message": Value::Null }),
            None,
        )),
        Err(e) => Ok(ok_envelope(
            json!({ "provider": config.provider, "ok": false, "message": e.to_string() }),
            None,
        )),
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:tenant_id/llm-config", get(get_llm_config).put(put_llm_config))
        .route("/:tenant_id/llm-config/verify", post(verify_llm_config))
}
