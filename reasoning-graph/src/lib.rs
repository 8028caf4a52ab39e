//! reasoning-graph - the reasoning state graph
//!
//! Six pure node functions (§4.8), the Graph Tool Agent and Data Service
//! client facades they call through (§4.5, §6), and the capability /
//! object-property executors (§4.9). The orchestrator here runs the nodes
//! in sequence and stops at the first `waiting_*` or terminal outcome;
//! persistence of sessions/turns/tasks/context/trace rows is the caller's
//! job (`reasoning-storage`, wired together in `reasoning-api`).

mod data_client;
mod executors;
mod llm;
mod nodes;
mod tools;
mod types;

pub use data_client::{
    DataFilter, DataGroupAnalysisRequest, DataQueryRequest, DataServiceClient, FilterOp,
    MetricSpec, SortOrder,
};
pub use executors::{execute_capability, execute_object_property, normalize_plan, NormalizedPlan, PlanMode};
pub use llm::{invoke_plan_json, invoke_typed_json, summarize, LlmRouting};
pub use nodes::{
    apply_confirmation_answer, discover_candidates, execute, finalize, inspect_ontology,
    select_anchor_ontologies, understand_intent, GraphDeps,
};
pub use tools::{
    AttributeDetail, CapabilityDetail, GraphToolAgent, ObjectPropertyDetail, OntologyDetail,
    OntologyResources, ScoredHit, SearchParams,
};
pub use types::{
    AnchorSelection, BusinessElement, DataPlan, GraphState, InspectAction, InspectDecision,
    IntentExtraction, NodeOutcome, PendingQuestion, RawFilter, RawMetric, TaskRecorder,
    TraceEmitter, noop_task_recorder, noop_trace_emitter,
};

#[cfg(any(test, feature = "test-fixtures"))]
pub use data_client::fake::InMemoryDataServiceClient;
#[cfg(any(test, feature = "test-fixtures"))]
pub use tools::fake::{FixtureAttribute, FixtureOntology, InMemoryGraphToolAgent};

use reasoning_core::{ReasoningError, ReasoningResult};

/// Run the six-node graph to completion or the first suspension point,
/// starting fresh at `understand_intent` (§5: the graph is always
/// restartable - there is no mid-node resume).
pub async fn run_graph(
    state: &mut GraphState,
    deps: &GraphDeps<'_>,
) -> ReasoningResult<NodeOutcome> {
    macro_rules! step {
        ($name:literal, $node:expr) => {
            tracing::debug!(session_id = %state.session_id, node = $name, "entering node");
            match $node.await {
                Ok(NodeOutcome::Continue) => {}
                Ok(other) => {
                    tracing::debug!(session_id = %state.session_id, node = $name, outcome = ?other, "node suspended run");
                    return Ok(other);
                }
                Err(e) => {
                    tracing::warn!(session_id = %state.session_id, node = $name, error = %e, "node failed");
                    return Err(e);
                }
            }
        };
    }

    step!("understand_intent", nodes::understand_intent(state, deps));
    step!("discover_candidates", nodes::discover_candidates(state, deps));
    step!("select_anchor_ontologies", nodes::select_anchor_ontologies(state, deps));
    step!("inspect_ontology", nodes::inspect_ontology(state, deps));
    step!("execute", nodes::execute(state, deps));

    tracing::debug!(session_id = %state.session_id, node = "finalize", "entering node");
    match nodes::finalize(state, deps).await {
        Ok(NodeOutcome::Completed) => Ok(NodeOutcome::Completed),
        Ok(other) => Ok(other),
        Err(e) => {
            tracing::warn!(session_id = %state.session_id, node = "finalize", error = %e, "node failed");
            Err(e)
        }
    }
}

/// A run against an already-terminal state is a programmer error at the
/// call site - the HTTP layer must check session status before invoking
/// the graph at all; this helper exists so that check has a typed error.
pub fn ensure_not_terminal(
    session_id: &reasoning_core::SessionId,
    status: reasoning_core::SessionStatus,
) -> ReasoningResult<()> {
    if status.is_terminal() {
        return Err(ReasoningError::Engine(reasoning_core::EngineError::SessionTerminal {
            session_id: session_id.to_string(),
            status: status.to_string(),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_client::fake::InMemoryDataServiceClient;
    use crate::tools::fake::{FixtureAttribute, FixtureOntology, InMemoryGraphToolAgent};
    use reasoning_core::{LlmRouteMetadata, LlmProvider, SessionId, TenantId, TraversalState, TurnId};
    use reasoning_llm::{noop_audit_callback, OpenAiCompatibleClient};
    use std::sync::Arc;

    fn fixture_tools() -> InMemoryGraphToolAgent {
        let agent = InMemoryGraphToolAgent::new();
        agent.add_ontology(FixtureOntology {
            detail: OntologyDetail {
                code: "user_profile".to_string(),
                name: "User Profile".to_string(),
                class_id: "class-user-profile".to_string(),
                capabilities: vec!["query_user".to_string()],
                object_properties: vec![],
                attribute_catalog: vec![AttributeDetail {
                    attribute_id: "attr-1".to_string(),
                    code: "mobile".to_string(),
                    name: "Mobile".to_string(),
                    data_type: "string".to_string(),
                    description: None,
                    field_name: "mobile_number".to_string(),
                }],
            },
            search_text: "user profile mobile phone number lookup".to_string(),
        });
        agent.add_attribute(FixtureAttribute {
            detail: AttributeDetail {
                attribute_id: "attr-1".to_string(),
                code: "mobile".to_string(),
                name: "Mobile".to_string(),
                data_type: "string".to_string(),
                description: None,
                field_name: "mobile_number".to_string(),
            },
            search_text: "mobile phone number".to_string(),
            related_ontology_codes: vec!["user_profile".to_string()],
        });
        agent.add_capability(CapabilityDetail {
            code: "query_user".to_string(),
            name: "Query User".to_string(),
            description: None,
            default_mode: "query".to_string(),
        });
        agent
    }

    /// Exercises `discover_candidates` end to end against the fixture
    /// agent without needing a real LLM: a query that lexically overlaps
    /// the fixture's `search_text` should surface the ontology.
    #[tokio::test]
    async fn discover_candidates_finds_fixture_ontology() {
        let tools = fixture_tools();
        let data_client = InMemoryDataServiceClient::new();
        let client = OpenAiCompatibleClient::new("deepseek", "http://127.0.0.1:1", "sk-test", 50)
            .expect("client should build");
        let deps = GraphDeps {
            graph_tools: &tools,
            data_client: &data_client,
            llm: LlmRouting {
                client: &client,
                provider: "deepseek",
                model: "deepseek-reasoner",
            },
            llm_route: LlmRouteMetadata {
                provider: LlmProvider::Deepseek,
                model: "deepseek-reasoner".to_string(),
                has_fallback: false,
            },
            audit_cb: noop_audit_callback(),
            trace: noop_trace_emitter(),
            task_recorder: noop_task_recorder(),
        };

        let mut state = GraphState::new(
            SessionId::now_v7(),
            TurnId::now_v7(),
            TenantId::now_v7(),
            "mobile phone number lookup",
            TraversalState::default(),
            None,
        );
        state.intent = Some(IntentExtraction {
            keywords: vec!["mobile".to_string(), "phone".to_string()],
            business_elements: vec![],
            goal_actions: vec![],
            intent_summary: String::new(),
        });

        let outcome = discover_candidates(&mut state, &deps).await.unwrap();
        assert!(matches!(outcome, NodeOutcome::Continue));
        assert!(state
            .ontology_candidates
            .iter()
            .any(|c| c.code == "user_profile"));
    }

    #[tokio::test]
    async fn discover_candidates_suspends_when_no_attribute_matches() {
        let tools = InMemoryGraphToolAgent::new();
        let data_client = InMemoryDataServiceClient::new();
        let client = OpenAiCompatibleClient::new("deepseek", "http://127.0.0.1:1", "sk-test", 50)
            .expect("client should build");
        let deps = GraphDeps {
            graph_tools: &tools,
            data_client: &data_client,
            llm: LlmRouting {
                client: &client,
                provider: "deepseek",
                model: "deepseek-reasoner",
            },
            llm_route: LlmRouteMetadata {
                provider: LlmProvider::Deepseek,
                model: "deepseek-reasoner".to_string(),
                has_fallback: false,
            },
            audit_cb: noop_audit_callback(),
            trace: noop_trace_emitter(),
            task_recorder: noop_task_recorder(),
        };

        let mut state = GraphState::new(
            SessionId::now_v7(),
            TurnId::now_v7(),
            TenantId::now_v7(),
            "anything at all",
            TraversalState::default(),
            None,
        );
        state.intent = Some(IntentExtraction::default());

        let outcome = discover_candidates(&mut state, &deps).await.unwrap();
        match outcome {
            NodeOutcome::Waiting(PendingQuestion::Clarification { reason, .. }) => {
                assert_eq!(reason, "no_attribute_match");
            }
            other => panic!("expected waiting/no_attribute_match, got {other:?}"),
        }
    }

    #[test]
    fn ensure_not_terminal_rejects_completed_sessions() {
        let session_id = SessionId::now_v7();
        let err = ensure_not_terminal(&session_id, reasoning_core::SessionStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Engine(reasoning_core::EngineError::SessionTerminal { .. })
        ));
    }
}
