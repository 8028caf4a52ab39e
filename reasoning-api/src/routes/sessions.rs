//! The reasoning REST surface (§6): `/api/v1/reasoning/sessions/...`.
//!
//! Each handler builds a fresh [`GraphDeps`] bound to the request's tenant
//! and, for mutating calls, a fresh [`TraceSink`] bound to the session/turn
//! at hand - per §5, the trace-sink external handle is the only thing
//! that's genuinely process-wide; everything else here lives on the stack.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use reasoning_core::{
    ClarificationKind, ConfirmationAnswer, ContextScope, LlmProvider, LlmRouteMetadata,
    ReasoningError, SessionId, SessionStatus, StorageError, TraversalState, TurnStatus,
    ValidationError,
};
use reasoning_graph::{
    apply_confirmation_answer, ensure_not_terminal, run_graph, GraphDeps, GraphState,
    LlmRouting, NodeOutcome, PendingQuestion,
};
use reasoning_llm::OpenAiCompatibleClient;
use reasoning_storage::{RepositoryTaskRecorder, TraceSink};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ok_envelope, ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateSessionRequest {
    pub user_input: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RunSessionRequest {
    #[serde(default)]
    pub user_input: Option<String>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClarifySessionRequest {
    pub answer: Value,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CancelSessionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Build the LLM routing client for a tenant, falling back to the
/// system-wide default provider/model when the tenant has no LLM config of
/// its own (no API key exists in that case either, so `default_llm`
/// without a tenant key only ever works against a self-hosted `generic`
/// endpoint that needs no key - otherwise this fails `VALIDATION`).
async fn resolve_llm_client(
    state: &AppState,
    tenant_id: reasoning_core::TenantId,
) -> ApiResult<(OpenAiCompatibleClient, String, String, bool)> {
    if let Some((config, api_key)) = state.tenant_config.resolve_for_routing(tenant_id).await? {
        let has_fallback = config.fallback_provider.is_some();
        let base_url = config
            .extra_json
            .as_ref()
            .and_then(|v| v.get("base_url"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| config.provider.default_base_url().map(str::to_string))
            .ok_or_else(|| {
                ApiError::from(ReasoningError::Validation(ValidationError::RequiredFieldMissing {
                    field: "base_url (required for a generic provider with no default)".to_string(),
                }))
            })?;
        let client = OpenAiCompatibleClient::new(
            config.provider.to_string(),
            base_url,
            api_key,
            state.reasoning_config.default_llm.timeout_ms,
        )?;
        return Ok((client, config.provider.to_string(), config.model, has_fallback));
    }

    let default_llm = &state.reasoning_config.default_llm;
    let base_url = default_llm.base_url.clone().or_else(|| {
        default_llm.provider.default_base_url().map(str::to_string)
    });
    let base_url = base_url.ok_or_else(|| {
        ApiError::from(ReasoningError::Validation(ValidationError::RequiredFieldMissing {
            field: "tenant llm-config (set one via PUT /llm-config first)".to_string(),
        }))
    })?;
    let client = OpenAiCompatibleClient::new(
        default_llm.provider.to_string(),
        base_url,
        String::new(),
        default_llm.timeout_ms,
    )?;
    Ok((client, default_llm.provider.to_string(), default_llm.model.clone(), false))
}

async fn load_traversal_state(state: &AppState, session_id: SessionId) -> ApiResult<TraversalState> {
    let stored = state
        .repo
        .get_latest_context(
            session_id,
            ContextScope::Session,
            reasoning_core::context_keys::TRAVERSAL_STATE,
        )
        .await?;
    Ok(match stored {
        Some(value) => serde_json::from_value(value).unwrap_or_default(),
        None => TraversalState::default(),
    })
}

async fn save_traversal_state(
    state: &AppState,
    session_id: SessionId,
    traversal_state: &TraversalState,
) -> ApiResult<()> {
    state
        .repo
        .put_context(
            session_id,
            ContextScope::Session,
            reasoning_core::context_keys::TRAVERSAL_STATE,
            serde_json::to_value(traversal_state).unwrap_or_default(),
        )
        .await?;
    Ok(())
}

/// `X-Trace-Id` is optional and purely caller-supplied correlation; echoed
/// back in the response envelope (§6) but never persisted as trace-event
/// metadata (the sink's `external_trace_id` column is reserved for the
/// external observability sink's own correlation id, not this header).
fn trace_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers.get("x-trace-id").and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn clarification_kind_for_reason(reason: &str) -> ClarificationKind {
    match reason {
        "no_attribute_match" => ClarificationKind::NoAttributeMatch,
        "no_ontology_match" => ClarificationKind::NoOntologyMatch,
        "anchor_ontology_missing" => ClarificationKind::AnchorOntologyMissing,
        "no_executable_resource" => ClarificationKind::NoExecutableResource,
        _ => ClarificationKind::Other,
    }
}

fn waiting_status_for(kind: &ClarificationKind) -> SessionStatus {
    match kind {
        ClarificationKind::TraversalConfirmation => SessionStatus::WaitingConfirmation,
        _ => SessionStatus::WaitingClarification,
    }
}

async fn require_session(
    state: &AppState,
    session_id: SessionId,
    tenant_id: reasoning_core::TenantId,
    trace_id: Option<String>,
) -> ApiResult<reasoning_core::ReasoningSession> {
    state
        .repo
        .get_session(session_id, tenant_id)
        .await?
        .ok_or_else(|| {
            ApiError::from(ReasoningError::Storage(StorageError::NotFound {
                entity: "session".to_string(),
                id: session_id.to_string(),
            }))
            .with_trace_id(trace_id)
        })
}

/// POST `/sessions` - create a session and its first turn.
async fn create_session(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Json(body): Json<CreateSessionRequest>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    let session = state.repo.create_session(auth.tenant_id, body.metadata).await?;
    let turn = state.repo.create_turn(session.session_id, &body.user_input).await?;

    let trace = TraceSink::new(
        state.repo.clone(),
        state.runtime_config.clone(),
        state.reasoning_config.secret_cipher_key.clone(),
        session.session_id,
        Some(turn.turn_id),
        auth.tenant_id,
    );
    reasoning_graph::TraceEmitter::emit(&trace, "create_session", "session_started", json!({})).await;

    Ok(ok_envelope(
        json!({
            "session_id": session.session_id,
            "status": session.status,
            "turn": {
                "turn_id": turn.turn_id,
                "turn_no": turn.turn_no,
                "status": turn.status,
                "user_input": turn.user_input,
            },
        }),
        trace_id,
    ))
}

/// GET `/sessions/{id}` - session, latest turn, pending clarification, tasks.
async fn get_session(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    let session = require_session(&state, session_id, auth.tenant_id, trace_id.clone()).await?;
    let latest_turn = state.repo.get_latest_turn(session_id).await?;
    let pending_clarification = state.repo.get_pending_clarification(session_id).await?;
    let tasks = match &latest_turn {
        Some(turn) => state.repo.list_tasks_for_turn(turn.turn_id).await?,
        None => Vec::new(),
    };

    Ok(ok_envelope(
        json!({
            "session_id": session.session_id,
            "tenant_id": session.tenant_id,
            "status": session.status,
            "created_at": session.created_at,
            "updated_at": session.updated_at,
            "ended_at": session.ended_at,
            "metadata": session.metadata,
            "latest_turn": latest_turn,
            "pending_clarification": pending_clarification,
            "tasks": tasks,
        }),
        trace_id,
    ))
}

/// POST `/sessions/{id}/run` - run (or resume) the reasoning state graph.
async fn run_session(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Path(session_id): Path<SessionId>,
    Json(body): Json<RunSessionRequest>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    let session = require_session(&state, session_id, auth.tenant_id, trace_id.clone()).await?;
    ensure_not_terminal(&session_id, session.status)?;

    let pending = state.repo.get_pending_clarification(session_id).await?;
    if let Some(pending) = pending {
        if body.user_input.is_some() {
            return Err(ApiError::from(ReasoningError::Engine(
                reasoning_core::EngineError::PendingClarification { session_id: session_id.to_string() },
            ))
            .with_trace_id(trace_id));
        }
        return Ok(ok_envelope(
            json!({
                "status": session.status,
                "clarification": {
                    "clarification_id": pending.clarification_id,
                    "question": pending.question,
                },
            }),
            trace_id,
        ));
    }

    let turn = match &body.user_input {
        Some(input) => state.repo.create_turn(session_id, input).await?,
        None => {
            let latest = state.repo.get_latest_turn(session_id).await?.ok_or_else(|| {
                ApiError::from(ReasoningError::Storage(StorageError::NotFound {
                    entity: "turn".to_string(),
                    id: session_id.to_string(),
                }))
                .with_trace_id(trace_id.clone())
            })?;
            if matches!(latest.status, TurnStatus::Completed | TurnStatus::Failed) {
                return Err(ApiError::from(ReasoningError::Storage(StorageError::NotFound {
                    entity: "turn".to_string(),
                    id: session_id.to_string(),
                }))
                .with_trace_id(trace_id));
            }
            latest
        }
    };

    let traversal_state = load_traversal_state(&state, session_id).await?;
    let preferred_anchor_code = traversal_state.approved_target_ontology_code.clone();

    let mut graph_state = GraphState::new(
        session_id,
        turn.turn_id,
        auth.tenant_id,
        turn.user_input.clone(),
        traversal_state,
        preferred_anchor_code,
    );

    let (llm_client, provider, model, has_fallback) =
        resolve_llm_client(&state, auth.tenant_id).await?;
    let llm_route = LlmRouteMetadata {
        provider: provider.parse::<LlmProvider>().unwrap_or(LlmProvider::Generic),
        model: model.clone(),
        has_fallback,
    };

    let trace = std::sync::Arc::new(TraceSink::new(
        state.repo.clone(),
        state.runtime_config.clone(),
        state.reasoning_config.secret_cipher_key.clone(),
        session_id,
        Some(turn.turn_id),
        auth.tenant_id,
    ));
    let audit_cb = reasoning_llm::noop_audit_callback();
    let task_recorder = std::sync::Arc::new(RepositoryTaskRecorder::new(
        state.repo.clone(),
        session_id,
        turn.turn_id,
    ));

    let deps = GraphDeps {
        graph_tools: state.graph_tools.as_ref(),
        data_client: state.data_client.as_ref(),
        llm: LlmRouting { client: &llm_client, provider: &provider, model: &model },
        llm_route,
        audit_cb,
        trace: trace.clone(),
        task_recorder,
    };

    let outcome = run_graph(&mut graph_state, &deps).await;

    match outcome {
        Ok(NodeOutcome::Completed) => {
            state.repo.complete_turn(turn.turn_id, graph_state.model_output.clone().unwrap_or_default()).await?;
            state
                .repo
                .update_session_status(session_id, SessionStatus::Completed, Some(chrono::Utc::now()))
                .await?;
            reasoning_graph::TraceEmitter::emit(trace.as_ref(), "finalize", "session_completed", json!({})).await;

            let tasks = state.repo.list_tasks_for_turn(turn.turn_id).await?;
            Ok(ok_envelope(
                json!({
                    "status": "completed",
                    "turn": {
                        "turn_id": turn.turn_id,
                        "turn_no": turn.turn_no,
                        "status": "completed",
                        "user_input": turn.user_input,
                    },
                    "result": graph_state.model_output,
                    "tasks": tasks,
                }),
                trace_id,
            ))
        }
        Ok(NodeOutcome::Continue) => unreachable!("run_graph always ends in Waiting or Completed"),
        Ok(NodeOutcome::Waiting(question)) => {
            let (kind, question_json) = match &question {
                PendingQuestion::Clarification { reason, payload } => (
                    clarification_kind_for_reason(reason),
                    json!({ "type": reason, "payload": payload }),
                ),
                PendingQuestion::TraversalConfirmation { from_code, to_code } => (
                    ClarificationKind::TraversalConfirmation,
                    json!({ "type": "traversal_confirmation", "from_code": from_code, "to_code": to_code }),
                ),
            };
            let session_status = waiting_status_for(&kind);
            let turn_status = match session_status {
                SessionStatus::WaitingConfirmation => TurnStatus::WaitingConfirmation,
                _ => TurnStatus::WaitingClarification,
            };

            let clarification = state
                .repo
                .create_clarification(session_id, kind.clone(), question_json)
                .await?;
            state.repo.set_turn_waiting(turn.turn_id, turn_status).await?;
            state
                .repo
                .update_session_status(session_id, session_status, None)
                .await?;

            let event_type = match kind {
                ClarificationKind::TraversalConfirmation => "traversal_confirmation_requested",
                _ => "clarification_asked",
            };
            reasoning_graph::TraceEmitter::emit(
                trace.as_ref(),
                "run_session",
                event_type,
                clarification.question.clone(),
            )
            .await;

            Ok(ok_envelope(
                json!({
                    "status": session_status,
                    "clarification": {
                        "clarification_id": clarification.clarification_id,
                        "question": clarification.question,
                    },
                }),
                trace_id,
            ))
        }
        Err(err) => {
            state.repo.fail_turn(turn.turn_id).await?;
            state
                .repo
                .update_session_status(session_id, SessionStatus::Failed, Some(chrono::Utc::now()))
                .await?;
            reasoning_graph::TraceEmitter::emit(
                trace.as_ref(),
                "run_session",
                "session_failed",
                json!({ "reason": err.to_string() }),
            )
            .await;
            Err(ApiError::from(err).with_trace_id(trace_id))
        }
    }
}

/// POST `/sessions/{id}/clarify` - answer the pending clarification.
async fn clarify_session(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Path(session_id): Path<SessionId>,
    Json(body): Json<ClarifySessionRequest>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    let session = require_session(&state, session_id, auth.tenant_id, trace_id.clone()).await?;
    ensure_not_terminal(&session_id, session.status)?;

    let pending = state.repo.get_pending_clarification(session_id).await?.ok_or_else(|| {
        ApiError::from(ReasoningError::Storage(StorageError::NotFound {
            entity: "pending clarification".to_string(),
            id: session_id.to_string(),
        }))
        .with_trace_id(trace_id.clone())
    })?;

    let clarification = state
        .repo
        .answer_clarification(pending.clarification_id, body.answer.clone())
        .await?;

    let trace = TraceSink::new(
        state.repo.clone(),
        state.runtime_config.clone(),
        state.reasoning_config.secret_cipher_key.clone(),
        session_id,
        None,
        auth.tenant_id,
    );

    if clarification.kind == ClarificationKind::TraversalConfirmation {
        let from_code = clarification.question.get("from_code").and_then(|v| v.as_str()).unwrap_or_default();
        let to_code = clarification.question.get("to_code").and_then(|v| v.as_str()).unwrap_or_default();
        let answer: ConfirmationAnswer = serde_json::from_value(body.answer.clone()).map_err(|e| {
            ApiError::bad_request(format!("invalid confirmation answer: {e}"))
                .with_trace_id(trace_id.clone())
        })?;
        let approved = answer.decision == reasoning_core::ConfirmationDecision::Approve;

        let mut traversal_state = load_traversal_state(&state, session_id).await?;
        apply_confirmation_answer(&mut traversal_state, from_code, to_code, approved);
        save_traversal_state(&state, session_id, &traversal_state).await?;

        reasoning_graph::TraceEmitter::emit(
            &trace,
            "clarify_session",
            "traversal_confirmation_received",
            json!({ "from_code": from_code, "to_code": to_code, "approved": approved }),
        )
        .await;
    }

    state
        .repo
        .update_session_status(session_id, SessionStatus::Created, None)
        .await?;

    Ok(ok_envelope(
        json!({
            "session_id": session_id,
            "status": "created",
            "clarification": {
                "clarification_id": clarification.clarification_id,
                "status": clarification.status,
            },
        }),
        trace_id,
    ))
}

/// GET `/sessions/{id}/trace` - the full, replayable trace-event list.
async fn get_trace(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    require_session(&state, session_id, auth.tenant_id, trace_id.clone()).await?;
    let items = state.repo.list_trace_events(session_id).await?;
    Ok(ok_envelope(json!({ "items": items }), trace_id))
}

/// POST `/sessions/{id}/cancel` - unconditionally terminate the session.
async fn cancel_session(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    headers: HeaderMap,
    Path(session_id): Path<SessionId>,
    Json(body): Json<CancelSessionRequest>,
) -> ApiResult<Json<Value>> {
    let trace_id = trace_id_from_headers(&headers);
    let session = require_session(&state, session_id, auth.tenant_id, trace_id.clone()).await?;
    ensure_not_terminal(&session_id, session.status)?;

    state
        .repo
        .update_session_status(session_id, SessionStatus::Cancelled, Some(chrono::Utc::now()))
        .await?;

    let trace = TraceSink::new(
        state.repo.clone(),
        state.runtime_config.clone(),
        state.reasoning_config.secret_cipher_key.clone(),
        session_id,
        None,
        auth.tenant_id,
    );
    reasoning_graph::TraceEmitter::emit(
        &trace,
        "cancel_session",
        "session_failed",
        json!({ "reason": body.reason.unwrap_or_else(|| "cancelled".to_string()) }),
    )
    .await;

    Ok(ok_envelope(
        json!({ "session_id": session_id, "status": "cancelled" }),
        trace_id,
    ))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/run", post(run_session))
        .route("/sessions/:id/clarify", post(clarify_session))
        .route("/sessions/:id/trace", get(get_trace))
        .route("/sessions/:id/cancel", post(cancel_session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clarification_kind_maps_known_reasons() {
        assert_eq!(clarification_kind_for_reason("no_attribute_match"), ClarificationKind::NoAttributeMatch);
        assert_eq!(clarification_kind_for_reason("something_else"), ClarificationKind::Other);
    }

    #[test]
    fn waiting_status_distinguishes_confirmation_from_clarification() {
        assert_eq!(waiting_status_for(&ClarificationKind::TraversalConfirmation), SessionStatus::WaitingConfirmation);
        assert_eq!(waiting_status_for(&ClarificationKind::NoAttributeMatch), SessionStatus::WaitingClarification);
    }
}
