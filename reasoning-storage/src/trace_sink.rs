//! The Trace Sink (§4.4): durable persistence of every trace row plus
//! best-effort external fan-out.
//!
//! [`reasoning_graph::TraceEmitter::emit`] is awaited by its callers and
//! persists the row inline, before returning, so that two emits issued
//! back-to-back land in `reasoning_trace_events` in the same order they
//! were issued (§5's "monotonic insertion order matches the caller-visible
//! causal order"). Only the external fan-out POST is detached onto the
//! Tokio runtime - its delivery order and success are not load-bearing.
//!
//! Event types outside the closed [`TraceEventType`] set - including the
//! three traversal HITL names the engine layer intentionally never emits
//! through this sink - are rewritten to `session_failed` with
//! `reason=unknown_event_type` and the original name preserved in the
//! payload, per §4.4.

use async_trait::async_trait;
use reasoning_core::{SessionId, SystemRuntimeConfig, TenantId, TraceEventType, TurnId};
use reasoning_graph::TraceEmitter;
use reqwest::Client;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::repository::ReasoningRepository;
use crate::runtime_config::RuntimeConfigCache;

struct ExternalClient {
    fingerprint: String,
    client: Client,
    endpoint: String,
    public_key: Option<String>,
    secret_key: Option<String>,
}

type ExternalCache = Arc<Mutex<Option<ExternalClient>>>;

/// One instance is built per graph run (it is bound to a session/turn/tenant
/// triple, which [`TraceEmitter::emit`]'s signature has no room for), and
/// handed to `reasoning-graph` as `Arc<dyn TraceEmitter>`.
pub struct TraceSink {
    repo: ReasoningRepository,
    runtime: Arc<RuntimeConfigCache>,
    secret_cipher_key: String,
    session_id: SessionId,
    turn_id: Option<TurnId>,
    tenant_id: TenantId,
    external: ExternalCache,
}

impl TraceSink {
    pub fn new(
        repo: ReasoningRepository,
        runtime: Arc<RuntimeConfigCache>,
        secret_cipher_key: String,
        session_id: SessionId,
        turn_id: Option<TurnId>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            repo,
            runtime,
            secret_cipher_key,
            session_id,
            turn_id,
            tenant_id,
            external: Arc::new(Mutex::new(None)),
        }
    }

    /// Rewrite per §4.4: unknown event types (including the three
    /// `traversal_*` names) become `session_failed` with the original name
    /// preserved in `raw_event_type`.
    fn canonicalize(event_type: &str, payload: Value) -> (&'static str, Value) {
        match TraceEventType::from_str(event_type) {
            Ok(known) => (event_type_static_str(known), payload),
            Err(_) => (
                "session_failed",
                json!({
                    "reason": "unknown_event_type",
                    "raw_event_type": event_type,
                    "original_payload": payload,
                }),
            ),
        }
    }
}

#[async_trait]
impl TraceEmitter for TraceSink {
    async fn emit(&self, step: &str, event_type: &str, payload: Value) {
        let (persisted_type, persisted_payload) = Self::canonicalize(event_type, payload);

        let insert_result = self
            .repo
            .insert_trace_event(
                self.session_id,
                self.turn_id,
                step,
                persisted_type,
                persisted_payload.clone(),
                None,
            )
            .await;
        if let Err(e) = insert_result {
            tracing::warn!(session_id = %self.session_id, error = %e, "failed to persist trace event");
        }

        let runtime = self.runtime.clone();
        let secret_cipher_key = self.secret_cipher_key.clone();
        let session_id = self.session_id;
        let turn_id = self.turn_id;
        let tenant_id = self.tenant_id;
        let external = self.external.clone();
        let step = step.to_string();

        tokio::spawn(async move {
            forward_external(
                &runtime,
                &secret_cipher_key,
                session_id,
                turn_id,
                tenant_id,
                &external,
                &step,
                persisted_type,
                &persisted_payload,
            )
            .await;
        });
    }
}

/// Rebuild the cached external client iff `config`'s fingerprint changed
/// since the cache was last populated. Returns `false` when the sink is
/// disabled or has no endpoint configured.
async fn ensure_external_client(
    external: &ExternalCache,
    secret_cipher_key: &str,
    config: &SystemRuntimeConfig,
) -> bool {
    let fingerprint = config.fingerprint();
    {
        let guard = external.lock().expect("trace sink lock poisoned");
        if let Some(existing) = guard.as_ref() {
            if existing.fingerprint == fingerprint {
                return true;
            }
        }
    }

    if !config.enabled {
        *external.lock().expect("trace sink lock poisoned") = None;
        return false;
    }
    let Some(endpoint) = config.endpoint.clone() else {
        return false;
    };
    let Ok(client) = Client::builder().timeout(Duration::from_secs(5)).build() else {
        return false;
    };
    let secret_key = match &config.secret_key_cipher {
        Some(cipher) => reasoning_crypto::decrypt(secret_cipher_key, cipher).ok(),
        None => None,
    };

    *external.lock().expect("trace sink lock poisoned") = Some(ExternalClient {
        fingerprint,
        client,
        endpoint,
        public_key: config.public_key.clone(),
        secret_key,
    });
    true
}

/// Trim `payload` to at most `max_chars` characters of its serialized JSON
/// form, for the outbound fan-out only; the persisted row is never
/// truncated.
fn trimmed_payload(payload: &Value, max_chars: usize) -> Value {
    let rendered = payload.to_string();
    if rendered.len() <= max_chars {
        return payload.clone();
    }
    json!({
        "truncated": true,
        "original_len": rendered.len(),
        "preview": rendered.chars().take(max_chars).collect::<String>(),
    })
}

#[allow(clippy::too_many_arguments)]
async fn forward_external(
    runtime: &RuntimeConfigCache,
    secret_cipher_key: &str,
    session_id: SessionId,
    turn_id: Option<TurnId>,
    tenant_id: TenantId,
    external: &ExternalCache,
    step: &str,
    event_type: &str,
    payload: &Value,
) {
    let config = runtime.current();
    if !config.enabled {
        return;
    }
    if !ensure_external_client(external, secret_cipher_key, &config).await {
        return;
    }

    let max_chars = runtime
        .audit_payload_max_chars_for(tenant_id)
        .await
        .unwrap_or(crate::runtime_config::DEFAULT_AUDIT_PAYLOAD_MAX_CHARS) as usize;
    let trimmed = trimmed_payload(payload, max_chars);

    let request = {
        let guard = external.lock().expect("trace sink lock poisoned");
        let Some(client) = guard.as_ref() else {
            return;
        };
        let body = json!({
            "session_id": session_id.to_string(),
            "turn_id": turn_id.map(|t| t.to_string()),
            "step": step,
            "event_type": event_type,
            "public_key": client.public_key,
            "payload": trimmed,
        });
        let request = client.client.post(&client.endpoint).json(&body);
        match &client.secret_key {
            Some(key) => request.header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    };

    // Best-effort: failures are swallowed, never surfaced to the run.
    if let Err(e) = request.send().await {
        tracing::debug!(session_id = %session_id, error = %e, "external trace fan-out failed");
    }
}

fn event_type_static_str(event_type: TraceEventType) -> &'static str {
    match event_type {
        TraceEventType::IntentParsed => "intent_parsed",
        TraceEventType::AttributesMatched => "attributes_matched",
        TraceEventType::OntologiesLocated => "ontologies_located",
        TraceEventType::TaskPlanned => "task_planned",
        TraceEventType::TaskExecuted => "task_executed",
        TraceEventType::ClarificationAsked => "clarification_asked",
        TraceEventType::RecoveryTriggered => "recovery_triggered",
        TraceEventType::SessionCompleted => "session_completed",
        TraceEventType::SessionFailed => "session_failed",
        TraceEventType::SessionStarted => "session_started",
        TraceEventType::McpCallRequested => "mcp_call_requested",
        TraceEventType::McpCallCompleted => "mcp_call_completed",
        TraceEventType::LlmPromptSent => "llm_prompt_sent",
        TraceEventType::LlmResponseReceived => "llm_response_received",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_passes_known_event_types_through() {
        let (event_type, payload) = TraceSink::canonicalize("session_started", json!({"a": 1}));
        assert_eq!(event_type, "session_started");
        assert_eq!(payload, json!({"a": 1}));
    }

    #[test]
    fn canonicalize_rewrites_unknown_event_types_to_session_failed() {
        let (event_type, payload) =
            TraceSink::canonicalize("traversal_confirmation_requested", json!({"from": "a"}));
        assert_eq!(event_type, "session_failed");
        assert_eq!(payload["reason"], "unknown_event_type");
        assert_eq!(payload["raw_event_type"], "traversal_confirmation_requested");
        assert_eq!(payload["original_payload"], json!({"from": "a"}));
    }

    #[test]
    fn trimmed_payload_passes_through_small_payloads() {
        let payload = json!({"a": 1});
        assert_eq!(trimmed_payload(&payload, 10_000), payload);
    }

    #[test]
    fn trimmed_payload_truncates_oversized_payloads() {
        let payload = json!({"blob": "x".repeat(5_000)});
        let trimmed = trimmed_payload(&payload, 100);
        assert_eq!(trimmed["truncated"], true);
        assert!(trimmed["preview"].as_str().unwrap().len() <= 100);
    }
}
