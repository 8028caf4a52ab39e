//! Core entity structures

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A multi-tenant reasoning session. The top-level unit of work; owns one
/// or more turns and is the scoping boundary for context, trace events, and
/// clarifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningSession {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub tenant_id: TenantId,
    pub status: SessionStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub ended_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

impl ReasoningSession {
    /// A fresh session in its initial state, owned by `tenant_id`.
    pub fn new(tenant_id: TenantId, now: Timestamp, metadata: Option<serde_json::Value>) -> Self {
        Self {
            session_id: SessionId::now_v7(),
            tenant_id,
            status: SessionStatus::Created,
            created_at: now,
            updated_at: now,
            ended_at: None,
            metadata,
        }
    }
}

/// One turn of user input and the engine's structured response within a
/// session. Turn numbers are strictly increasing and contiguous per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningTurn {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub turn_id: TurnId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    pub turn_no: i32,
    pub user_input: String,
    pub status: TurnStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub model_output: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// The engine's typed plan for one capability or object-property invocation.
/// Tasks are append-only within a turn - retries create new rows rather
/// than mutating a failed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningTask {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub task_id: TaskId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub turn_id: TurnId,
    pub task_type: TaskType,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub task_payload: serde_json::Value,
    pub status: TaskStatus,
    pub retry_count: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// One append-only version of a context-store fact, keyed by
/// `(session, scope, key)`. Readers take the latest version per key within
/// the scopes they request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningContextEntry {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub context_entry_id: ContextEntryId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    pub scope: ContextScope,
    pub key: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub value: serde_json::Value,
    pub version: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Reserved context-store keys the engine itself reads and writes.
pub mod context_keys {
    pub const TRAVERSAL_STATE: &str = "traversal_state";
    pub const SELECTED_ONTOLOGY: &str = "selected_ontology";
    pub const PLAN_STATE: &str = "plan_state";
    pub const LATEST_RESULT: &str = "latest_result";
}

/// An authoritative, append-only record of what happened during a run.
/// Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningTraceEvent {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub trace_event_id: TraceEventId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub turn_id: Option<TurnId>,
    pub step: String,
    /// Persisted verbatim as a string: validated against the closed
    /// [`TraceEventType`] set by the sink, not by this struct.
    pub event_type: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: serde_json::Value,
    pub external_trace_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// A question the engine needs a human answer to before it can proceed -
/// either an engine-initiated clarification or a traversal confirmation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReasoningClarification {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub clarification_id: ClarificationId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: SessionId,
    pub kind: ClarificationKind,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub question: serde_json::Value,
    pub status: ClarificationStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub answer: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub answered_at: Option<Timestamp>,
}

/// Decision carried by a `{type:"confirmation", ...}` clarification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ConfirmationDecision {
    Approve,
    Reject,
}

/// The shape of a traversal-confirmation clarification answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConfirmationAnswer {
    pub decision: ConfirmationDecision,
    pub note: Option<String>,
}

/// Per-tenant LLM routing: active provider/model plus an optional fallback,
/// with per-provider API key ciphertexts so switching the active provider
/// never discards a previously entered key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TenantLlmConfig {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub tenant_id: TenantId,
    pub provider: LlmProvider,
    pub model: String,
    pub fallback_provider: Option<LlmProvider>,
    pub fallback_model: Option<String>,
    /// Ciphertext of the API key, keyed by provider name. Stored under a
    /// reserved key inside `extra_json` at the storage layer; modeled here
    /// as its own field because callers never see raw ciphertext directly.
    pub api_key_cipher_by_provider: HashMap<String, String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub extra_json: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl TenantLlmConfig {
    /// Whether a ciphertext already exists for the given provider, so a
    /// provider switch without a fresh API key can be validated.
    pub fn has_key_for(&self, provider: &LlmProvider) -> bool {
        self.api_key_cipher_by_provider
            .contains_key(&provider.to_string())
    }
}

/// Metadata about which provider/model actually served a completed run,
/// surfaced in `model_output.llm_route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LlmRouteMetadata {
    pub provider: LlmProvider,
    pub model: String,
    pub has_fallback: bool,
}

/// A pending cross-ontology hop awaiting human confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PendingTraversal {
    pub from_code: String,
    pub to_code: String,
}

/// Per-session traversal bookkeeping, persisted in the context store under
/// [`context_keys::TRAVERSAL_STATE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TraversalState {
    pub depth: i32,
    pub max_depth: i32,
    pub branch_budget: i32,
    pub visited_ontology_codes: Vec<String>,
    pub pending_traversal: Option<PendingTraversal>,
    pub approved_target_ontology_code: Option<String>,
}

impl Default for TraversalState {
    fn default() -> Self {
        Self {
            depth: 0,
            max_depth: 2,
            branch_budget: 3,
            visited_ontology_codes: Vec::new(),
            pending_traversal: None,
            approved_target_ontology_code: None,
        }
    }
}

impl TraversalState {
    /// Whether a new hop from `current_code` to `target_code` is still
    /// within budget and would not revisit a code already walked.
    pub fn can_traverse_to(&self, target_code: &str) -> bool {
        self.depth < self.max_depth
            && self.branch_budget > 0
            && !self.visited_ontology_codes.iter().any(|c| c == target_code)
    }

    /// Record a hop: bump depth, spend one unit of branch budget, and mark
    /// both endpoints visited.
    pub fn record_hop(&mut self, from_code: &str, to_code: Option<&str>) {
        self.depth += 1;
        self.branch_budget -= 1;
        if !self.visited_ontology_codes.iter().any(|c| c == from_code) {
            self.visited_ontology_codes.push(from_code.to_string());
        }
        if let Some(to_code) = to_code {
            if !self.visited_ontology_codes.iter().any(|c| c == to_code) {
                self.visited_ontology_codes.push(to_code.to_string());
            }
        }
    }
}

/// Per-tenant operational overrides layered under [`SystemRuntimeConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TenantRuntimeConfig {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub tenant_id: TenantId,
    pub audit_payload_max_chars: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Bounds for [`TenantRuntimeConfig::audit_payload_max_chars`].
pub const AUDIT_PAYLOAD_MAX_CHARS_MIN: i32 = 2_000;
pub const AUDIT_PAYLOAD_MAX_CHARS_MAX: i32 = 200_000;

impl TenantRuntimeConfig {
    /// Clamp a requested override into the allowed range.
    pub fn clamp_audit_payload_max_chars(value: i32) -> i32 {
        value.clamp(AUDIT_PAYLOAD_MAX_CHARS_MIN, AUDIT_PAYLOAD_MAX_CHARS_MAX)
    }
}

/// Process-wide external observability sink configuration, hot-reloadable
/// without a restart. Exactly one row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SystemRuntimeConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub public_key: Option<String>,
    /// Ciphertext of the sink's secret key.
    pub secret_key_cipher: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl SystemRuntimeConfig {
    /// A fingerprint that changes iff the external client needs rebuilding:
    /// provider/host plus whether keys are present (never the key material).
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.enabled,
            self.endpoint.as_deref().unwrap_or(""),
            self.public_key.is_some(),
            self.secret_key_cipher.is_some()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_state_respects_budget_and_cycle_guard() {
        let mut state = TraversalState::default();
        assert!(state.can_traverse_to("target_a"));

        state.record_hop("anchor", Some("target_a"));
        assert_eq!(state.depth, 1);
        assert_eq!(state.branch_budget, 2);
        assert!(!state.can_traverse_to("anchor"));
        assert!(!state.can_traverse_to("target_a"));

        state.record_hop("target_a", Some("target_b"));
        assert_eq!(state.depth, 2);
        assert!(!state.can_traverse_to("target_c"), "max_depth reached");
    }

    #[test]
    fn audit_payload_max_chars_clamps_into_range() {
        assert_eq!(
            TenantRuntimeConfig::clamp_audit_payload_max_chars(100),
            AUDIT_PAYLOAD_MAX_CHARS_MIN
        );
        assert_eq!(
            TenantRuntimeConfig::clamp_audit_payload_max_chars(10_000_000),
            AUDIT_PAYLOAD_MAX_CHARS_MAX
        );
        assert_eq!(TenantRuntimeConfig::clamp_audit_payload_max_chars(50_000), 50_000);
    }

    #[test]
    fn tenant_llm_config_has_key_for_checks_provider_map() {
        let mut ciphers = HashMap::new();
        ciphers.insert("deepseek".to_string(), "ct".to_string());
        let config = TenantLlmConfig {
            tenant_id: TenantId::now_v7(),
            provider: LlmProvider::Deepseek,
            model: "deepseek-reasoner".to_string(),
            fallback_provider: None,
            fallback_model: None,
            api_key_cipher_by_provider: ciphers,
            extra_json: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(config.has_key_for(&LlmProvider::Deepseek));
        assert!(!config.has_key_for(&LlmProvider::Qwen));
    }

    #[test]
    fn system_runtime_config_fingerprint_ignores_key_material() {
        let a = SystemRuntimeConfig {
            enabled: true,
            endpoint: Some("https://sink.example".to_string()),
            public_key: Some("pk_1".to_string()),
            secret_key_cipher: Some("ct_1".to_string()),
            updated_at: chrono::Utc::now(),
        };
        let mut b = a.clone();
        b.secret_key_cipher = Some("ct_2".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = a.clone();
        c.endpoint = Some("https://other.example".to_string());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
