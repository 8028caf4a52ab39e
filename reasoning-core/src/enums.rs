//! Enum types for reasoning-engine entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// SESSION / TURN / TASK / CLARIFICATION STATUS
// ============================================================================

/// Lifecycle status of a reasoning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SessionStatus {
    Created,
    Running,
    WaitingClarification,
    WaitingConfirmation,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Terminal states never transition further except to append trace events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    /// Either of the two suspension states the graph can leave a session in.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            SessionStatus::WaitingClarification | SessionStatus::WaitingConfirmation
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SessionStatus::Created => "created",
            SessionStatus::Running => "running",
            SessionStatus::WaitingClarification => "waiting_clarification",
            SessionStatus::WaitingConfirmation => "waiting_confirmation",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "created" => Ok(SessionStatus::Created),
            "running" => Ok(SessionStatus::Running),
            "waitingclarification" => Ok(SessionStatus::WaitingClarification),
            "waitingconfirmation" => Ok(SessionStatus::WaitingConfirmation),
            "completed" | "complete" => Ok(SessionStatus::Completed),
            "failed" | "failure" => Ok(SessionStatus::Failed),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            _ => Err(format!("Invalid SessionStatus: {}", s)),
        }
    }
}

/// Lifecycle status of a single turn within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TurnStatus {
    Running,
    WaitingClarification,
    WaitingConfirmation,
    Completed,
    Failed,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TurnStatus::Running => "running",
            TurnStatus::WaitingClarification => "waiting_clarification",
            TurnStatus::WaitingConfirmation => "waiting_confirmation",
            TurnStatus::Completed => "completed",
            TurnStatus::Failed => "failed",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for TurnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "running" => Ok(TurnStatus::Running),
            "waitingclarification" => Ok(TurnStatus::WaitingClarification),
            "waitingconfirmation" => Ok(TurnStatus::WaitingConfirmation),
            "completed" | "complete" => Ok(TurnStatus::Completed),
            "failed" | "failure" => Ok(TurnStatus::Failed),
            _ => Err(format!("Invalid TurnStatus: {}", s)),
        }
    }
}

/// Which kind of executor a task was planned against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TaskType {
    Capability,
    ObjectProperty,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TaskType::Capability => "capability",
            TaskType::ObjectProperty => "object_property",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "capability" => Ok(TaskType::Capability),
            "objectproperty" => Ok(TaskType::ObjectProperty),
            _ => Err(format!("Invalid TaskType: {}", s)),
        }
    }
}

/// Lifecycle status of a reasoning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" | "complete" => Ok(TaskStatus::Completed),
            "failed" | "failure" => Ok(TaskStatus::Failed),
            _ => Err(format!("Invalid TaskStatus: {}", s)),
        }
    }
}

/// Status of a pending clarification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ClarificationStatus {
    Pending,
    Answered,
}

impl fmt::Display for ClarificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ClarificationStatus::Pending => "pending",
            ClarificationStatus::Answered => "answered",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for ClarificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "pending" => Ok(ClarificationStatus::Pending),
            "answered" => Ok(ClarificationStatus::Answered),
            _ => Err(format!("Invalid ClarificationStatus: {}", s)),
        }
    }
}

/// The reason a clarification or confirmation was raised.
///
/// Kept as a free-form-but-known set rather than a closed enum: nodes may
/// introduce new reason codes (e.g. `no_attribute_match`) without requiring
/// a core-crate release, but the well-known ones get a name here for the
/// handful of places that branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ClarificationKind {
    NoAttributeMatch,
    NoOntologyMatch,
    AnchorOntologyMissing,
    NoExecutableResource,
    TraversalConfirmation,
    Other,
}

impl fmt::Display for ClarificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ClarificationKind::NoAttributeMatch => "no_attribute_match",
            ClarificationKind::NoOntologyMatch => "no_ontology_match",
            ClarificationKind::AnchorOntologyMissing => "anchor_ontology_missing",
            ClarificationKind::NoExecutableResource => "no_executable_resource",
            ClarificationKind::TraversalConfirmation => "traversal_confirmation",
            ClarificationKind::Other => "other",
        };
        write!(f, "{}", value)
    }
}

/// Scope a context-store key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ContextScope {
    Global,
    Session,
    Local,
    Artifact,
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ContextScope::Global => "global",
            ContextScope::Session => "session",
            ContextScope::Local => "local",
            ContextScope::Artifact => "artifact",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for ContextScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "global" => Ok(ContextScope::Global),
            "session" => Ok(ContextScope::Session),
            "local" => Ok(ContextScope::Local),
            "artifact" => Ok(ContextScope::Artifact),
            _ => Err(format!("Invalid ContextScope: {}", s)),
        }
    }
}

// ============================================================================
// TRACE EVENT TYPE (closed set)
// ============================================================================

/// The closed set of trace event types the sink will persist verbatim.
///
/// Anything outside this set - including the traversal HITL call sites that
/// emit `traversal_confirmation_requested`, `traversal_confirmation_received`,
/// and `traversal_step_completed` - gets rewritten by the sink to
/// `SessionFailed` with `reason=unknown_event_type`. That rewrite is
/// deliberate system behavior, not a gap in this list; do not grow the set
/// to absorb those names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TraceEventType {
    IntentParsed,
    AttributesMatched,
    OntologiesLocated,
    TaskPlanned,
    TaskExecuted,
    ClarificationAsked,
    RecoveryTriggered,
    SessionCompleted,
    SessionFailed,
    SessionStarted,
    McpCallRequested,
    McpCallCompleted,
    LlmPromptSent,
    LlmResponseReceived,
}

impl TraceEventType {
    pub const ALL: [TraceEventType; 14] = [
        TraceEventType::IntentParsed,
        TraceEventType::AttributesMatched,
        TraceEventType::OntologiesLocated,
        TraceEventType::TaskPlanned,
        TraceEventType::TaskExecuted,
        TraceEventType::ClarificationAsked,
        TraceEventType::RecoveryTriggered,
        TraceEventType::SessionCompleted,
        TraceEventType::SessionFailed,
        TraceEventType::SessionStarted,
        TraceEventType::McpCallRequested,
        TraceEventType::McpCallCompleted,
        TraceEventType::LlmPromptSent,
        TraceEventType::LlmResponseReceived,
    ];
}

impl fmt::Display for TraceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
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
        };
        write!(f, "{}", value)
    }
}

impl FromStr for TraceEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intent_parsed" => Ok(TraceEventType::IntentParsed),
            "attributes_matched" => Ok(TraceEventType::AttributesMatched),
            "ontologies_located" => Ok(TraceEventType::OntologiesLocated),
            "task_planned" => Ok(TraceEventType::TaskPlanned),
            "task_executed" => Ok(TraceEventType::TaskExecuted),
            "clarification_asked" => Ok(TraceEventType::ClarificationAsked),
            "recovery_triggered" => Ok(TraceEventType::RecoveryTriggered),
            "session_completed" => Ok(TraceEventType::SessionCompleted),
            "session_failed" => Ok(TraceEventType::SessionFailed),
            "session_started" => Ok(TraceEventType::SessionStarted),
            "mcp_call_requested" => Ok(TraceEventType::McpCallRequested),
            "mcp_call_completed" => Ok(TraceEventType::McpCallCompleted),
            "llm_prompt_sent" => Ok(TraceEventType::LlmPromptSent),
            "llm_response_received" => Ok(TraceEventType::LlmResponseReceived),
            _ => Err(format!("unknown event type: {}", s)),
        }
    }
}

// ============================================================================
// LLM PROVIDER
// ============================================================================

/// Known LLM providers with baked-in default base URLs.
///
/// `Generic` covers a tenant-supplied `base_url` override for any other
/// OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum LlmProvider {
    Deepseek,
    Qwen,
    Generic,
}

impl LlmProvider {
    /// Default OpenAI-compatible base URL for providers that have one.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Deepseek => Some("https://api.deepseek.com/v1"),
            LlmProvider::Qwen => {
                Some("https://dashscope.aliyuncs.com/compatible-mode/v1")
            }
            LlmProvider::Generic => None,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LlmProvider::Deepseek => "deepseek",
            LlmProvider::Qwen => "qwen",
            LlmProvider::Generic => "generic",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "deepseek" => Ok(LlmProvider::Deepseek),
            "qwen" => Ok(LlmProvider::Qwen),
            "generic" => Ok(LlmProvider::Generic),
            _ => Err(format!("Invalid LlmProvider: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(!SessionStatus::WaitingClarification.is_terminal());
    }

    #[test]
    fn session_status_waiting_states() {
        assert!(SessionStatus::WaitingClarification.is_waiting());
        assert!(SessionStatus::WaitingConfirmation.is_waiting());
        assert!(!SessionStatus::Running.is_waiting());
    }

    #[test]
    fn trace_event_type_round_trips() {
        for variant in TraceEventType::ALL {
            let s = variant.to_string();
            let parsed: TraceEventType = s.parse().expect("known event type should parse");
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn trace_event_type_rejects_unlisted_traversal_names() {
        assert!("traversal_confirmation_requested"
            .parse::<TraceEventType>()
            .is_err());
        assert!("traversal_confirmation_received"
            .parse::<TraceEventType>()
            .is_err());
        assert!("traversal_step_completed".parse::<TraceEventType>().is_err());
    }

    #[test]
    fn llm_provider_known_defaults() {
        assert_eq!(
            LlmProvider::Deepseek.default_base_url(),
            Some("https://api.deepseek.com/v1")
        );
        assert_eq!(LlmProvider::Generic.default_base_url(), None);
    }
}
