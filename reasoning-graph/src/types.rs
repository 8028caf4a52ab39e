//! Tagged JSON bundles parsed once at each node boundary (§9 "Dynamic JSON
//! bundles"), plus the run state and trace-emission seam threaded through
//! the six nodes.

use crate::tools::{OntologyDetail, ScoredHit};
use async_trait::async_trait;
use reasoning_core::{ReasoningResult, SessionId, TaskId, TaskType, TenantId, TraversalState, TurnId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One `{name, value, role}` element the LLM extracted from the user's
/// input at `understand_intent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessElement {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub role: String,
}

/// `understand_intent`'s parsed reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentExtraction {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub business_elements: Vec<BusinessElement>,
    #[serde(default)]
    pub goal_actions: Vec<String>,
    #[serde(default)]
    pub intent_summary: String,
}

/// `select_anchor_ontologies`'s parsed reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorSelection {
    #[serde(default)]
    pub input_ontology_codes: Vec<String>,
    #[serde(default)]
    pub target_ontology_codes: Vec<String>,
}

/// Which resource kind `inspect_ontology` decided to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectAction {
    ExecuteCapability,
    ExecuteObjectProperty,
}

/// `inspect_ontology`'s parsed reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectDecision {
    pub action: InspectAction,
    #[serde(default)]
    pub capability_code: Option<String>,
    #[serde(default)]
    pub object_property_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One raw filter clause as the LLM produces it, before op coercion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFilter {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub value: Value,
}

/// One raw metric spec as the LLM produces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMetric {
    #[serde(default)]
    pub agg: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// The executors' shared LLM plan shape, before mode-specific normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPlan {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<RawMetric>,
    /// Object-property executor only: which target ontology code the LLM
    /// chose among the candidates it was offered.
    #[serde(default)]
    pub target_ontology_code: Option<String>,
}

/// A question the graph needs a human answer to, produced by a node that
/// suspends the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingQuestion {
    /// Engine-initiated clarification (`waiting_clarification`).
    Clarification { reason: String, payload: Value },
    /// Traversal human gate (`waiting_confirmation`).
    TraversalConfirmation { from_code: String, to_code: String },
}

/// What a node decided after running: keep going, suspend, or finish.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Continue,
    Waiting(PendingQuestion),
    Completed,
}

/// Emits one trace row. Implemented by the Trace Sink in `reasoning-storage`;
/// kept as a local trait here so `reasoning-graph` has no dependency on it.
/// Event type strings are passed through verbatim - closed-set validation
/// and rewriting is the sink's responsibility, not this crate's (§4.4).
///
/// `emit` is awaited by its callers and must persist the row before
/// returning, so that two emits issued back-to-back land in the same order
/// they were issued (§5's "monotonic insertion order matches the
/// caller-visible causal order"); any external fan-out is the
/// implementation's own business and may run detached.
#[async_trait]
pub trait TraceEmitter: Send + Sync {
    async fn emit(&self, step: &str, event_type: &str, payload: Value);
}

/// A [`TraceEmitter`] that discards everything, for tests and standalone use.
pub fn noop_trace_emitter() -> Arc<dyn TraceEmitter> {
    struct Noop;
    #[async_trait]
    impl TraceEmitter for Noop {
        async fn emit(&self, _step: &str, _event_type: &str, _payload: Value) {}
    }
    Arc::new(Noop)
}

/// Persists the one `ReasoningTask` row a successful turn creates (§4.8.1.5,
/// §4.8.2: "exactly one executable task is created per successful turn").
/// Implemented by `ReasoningRepository` in `reasoning-storage`; kept as a
/// local trait here, same seam as [`TraceEmitter`], so `reasoning-graph`
/// never depends on the storage crate directly.
#[async_trait]
pub trait TaskRecorder: Send + Sync {
    /// Insert a `status=pending` task row, returning its id.
    async fn create(&self, task_type: TaskType, task_payload: Value) -> ReasoningResult<TaskId>;
    /// Flip a previously created task's status (`completed` or `failed`).
    async fn mark_status(&self, task_id: TaskId, status: reasoning_core::TaskStatus) -> ReasoningResult<()>;
}

/// A [`TaskRecorder`] that discards everything, for tests and standalone use.
pub fn noop_task_recorder() -> Arc<dyn TaskRecorder> {
    struct Noop;
    #[async_trait]
    impl TaskRecorder for Noop {
        async fn create(&self, _task_type: TaskType, _task_payload: Value) -> ReasoningResult<TaskId> {
            Ok(TaskId::now_v7())
        }
        async fn mark_status(&self, _task_id: TaskId, _status: reasoning_core::TaskStatus) -> ReasoningResult<()> {
            Ok(())
        }
    }
    Arc::new(Noop)
}

/// The state threaded through the six nodes of one `run`. Each node is a
/// pure function `(state) -> state` per §4.8; the orchestrator in `lib.rs`
/// owns persistence, this struct only owns in-flight values.
#[derive(Debug, Clone)]
pub struct GraphState {
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub tenant_id: TenantId,
    pub user_input: String,

    pub traversal_state: TraversalState,
    /// Resume token: an anchor code to prefer, carried from an approved
    /// traversal confirmation on a prior run.
    pub preferred_anchor_code: Option<String>,

    pub intent: Option<IntentExtraction>,
    pub attribute_candidates: Vec<ScoredHit>,
    pub ontology_candidates: Vec<ScoredHit>,

    pub selected_ontology_code: Option<String>,
    pub selected_ontology: Option<OntologyDetail>,

    pub task_id: Option<TaskId>,
    pub task_type: Option<reasoning_core::TaskType>,
    pub executor_output: Option<Value>,

    /// Accumulated `plan_state` fields (`input_ontology`, `target_ontology`,
    /// `data_execution`, `execution_mode`, `executor_plan`, ...).
    pub plan_state: serde_json::Map<String, Value>,

    pub model_output: Option<Value>,
}

impl GraphState {
    pub fn new(
        session_id: SessionId,
        turn_id: TurnId,
        tenant_id: TenantId,
        user_input: impl Into<String>,
        traversal_state: TraversalState,
        preferred_anchor_code: Option<String>,
    ) -> Self {
        Self {
            session_id,
            turn_id,
            tenant_id,
            user_input: user_input.into(),
            traversal_state,
            preferred_anchor_code,
            intent: None,
            attribute_candidates: Vec::new(),
            ontology_candidates: Vec::new(),
            selected_ontology_code: None,
            selected_ontology: None,
            task_id: None,
            task_type: None,
            executor_output: None,
            plan_state: serde_json::Map::new(),
            model_output: None,
        }
    }
}
