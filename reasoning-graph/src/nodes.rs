//! The six reasoning-state-graph nodes (§4.8.1).
//!
//! Each node takes the run's [`GraphState`] and a [`GraphDeps`] bundle and
//! returns a [`NodeOutcome`]. Nodes never reach into persistence directly;
//! the orchestrator in `lib.rs` owns transitions between `Continue`,
//! `Waiting`, and `Completed`.

use crate::data_client::DataServiceClient;
use crate::executors::{execute_capability, execute_object_property};
use crate::llm::{invoke_typed_json, summarize, LlmRouting};
use crate::tools::GraphToolAgent;
use crate::types::{
    AnchorSelection, GraphState, InspectAction, InspectDecision, IntentExtraction, NodeOutcome,
    PendingQuestion, TaskRecorder, TraceEmitter,
};
use reasoning_core::{
    EngineError, LlmRouteMetadata, ReasoningError, ReasoningResult, TaskStatus, TaskType,
};
use reasoning_llm::AuditCallback;
use std::sync::Arc;

/// Shared dependencies every node needs: the two external service clients,
/// LLM routing, the audit callback, and the trace-emission seam.
pub struct GraphDeps<'a> {
    pub graph_tools: &'a dyn GraphToolAgent,
    pub data_client: &'a dyn DataServiceClient,
    pub llm: LlmRouting<'a>,
    pub llm_route: LlmRouteMetadata,
    pub audit_cb: AuditCallback,
    pub trace: Arc<dyn TraceEmitter>,
    pub task_recorder: Arc<dyn TaskRecorder>,
}

fn rule_based_keywords(input: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut keywords = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation()) {
        let token = token.trim();
        if token.chars().count() <= 1 {
            continue;
        }
        let lower = token.to_lowercase();
        if seen.insert(lower.clone()) {
            keywords.push(lower);
        }
        if keywords.len() >= 8 {
            break;
        }
    }
    keywords
}

/// 1. `understand_intent`.
pub async fn understand_intent(state: &mut GraphState, deps: &GraphDeps<'_>) -> ReasoningResult<NodeOutcome> {
    const SYSTEM_PROMPT: &str = "Extract the user's intent as JSON: keywords[], \
        business_elements[] (each {name,value,role}), goal_actions[], intent_summary.";

    let user_payload = serde_json::json!({ "query": state.user_input });
    let schema_hint = serde_json::json!({
        "keywords": ["string"],
        "business_elements": [{"name": "string", "value": "string", "role": "string"}],
        "goal_actions": ["string"],
        "intent_summary": "string",
    });

    let mut intent: IntentExtraction = invoke_typed_json(
        &deps.llm,
        "understand_intent",
        SYSTEM_PROMPT,
        &user_payload,
        &schema_hint,
        &deps.audit_cb,
    )
    .await?;

    if intent.keywords.is_empty() {
        intent.keywords = rule_based_keywords(&state.user_input);
    }

    deps.trace.emit(
        "understand_intent",
        "intent_parsed",
        serde_json::to_value(&intent).unwrap_or_default(),
    ).await;
    deps.trace.emit(
        "understand_intent",
        "plan_generated",
        serde_json::json!({ "goal_actions": intent.goal_actions }),
    ).await;

    state.intent = Some(intent);
    Ok(NodeOutcome::Continue)
}

/// 2. `discover_candidates`.
pub async fn discover_candidates(
    state: &mut GraphState,
    deps: &GraphDeps<'_>,
) -> ReasoningResult<NodeOutcome> {
    use crate::tools::{ScoredHit, SearchParams};

    let intent = state.intent.clone().unwrap_or_default();

    let mut queries = vec![state.user_input.clone()];
    queries.extend(intent.keywords.iter().take(4).cloned());
    queries.extend(
        intent
            .business_elements
            .iter()
            .take(4)
            .map(|e| e.value.clone()),
    );

    let mut attribute_pool: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    for query in &queries {
        let hits = deps
            .graph_tools
            .list_data_attributes(&SearchParams::new(query.clone()))
            .await?;
        for hit in hits {
            attribute_pool
                .entry(hit.code)
                .and_modify(|s| *s = s.max(hit.score))
                .or_insert(hit.score);
        }
    }

    if attribute_pool.is_empty() {
        return Ok(NodeOutcome::Waiting(PendingQuestion::Clarification {
            reason: "no_attribute_match".to_string(),
            payload: serde_json::json!({}),
        }));
    }

    let mut attribute_candidates: Vec<ScoredHit> = attribute_pool
        .into_iter()
        .map(|(code, score)| ScoredHit { code, score })
        .collect();
    attribute_candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let mut ontology_pool: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    for attribute in attribute_candidates.iter().take(8) {
        let related = deps
            .graph_tools
            .get_data_attribute_related_ontologies(&attribute.code)
            .await?;
        for code in related {
            *ontology_pool.entry(code).or_insert(0.0) += 0.1;
        }
    }

    let joined_keywords = intent.keywords.join(" ");
    let ontology_queries = [state.user_input.clone(), joined_keywords];
    for query in &ontology_queries {
        let hits = deps
            .graph_tools
            .list_ontologies(&SearchParams::new(query.clone()))
            .await?;
        for hit in hits {
            ontology_pool
                .entry(hit.code)
                .and_modify(|s| *s = s.max(hit.score))
                .or_insert(hit.score);
        }
    }

    if ontology_pool.is_empty() {
        return Ok(NodeOutcome::Waiting(PendingQuestion::Clarification {
            reason: "no_ontology_match".to_string(),
            payload: serde_json::json!({}),
        }));
    }

    let mut ontology_candidates: Vec<ScoredHit> = ontology_pool
        .into_iter()
        .map(|(code, score)| ScoredHit { code, score })
        .collect();
    ontology_candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    deps.trace.emit(
        "discover_candidates",
        "attributes_matched",
        serde_json::to_value(&attribute_candidates).unwrap_or_default(),
    ).await;
    deps.trace.emit(
        "discover_candidates",
        "ontologies_located",
        serde_json::to_value(&ontology_candidates).unwrap_or_default(),
    ).await;

    state.attribute_candidates = attribute_candidates;
    state.ontology_candidates = ontology_candidates;
    Ok(NodeOutcome::Continue)
}

/// 3. `select_anchor_ontologies`.
pub async fn select_anchor_ontologies(
    state: &mut GraphState,
    deps: &GraphDeps<'_>,
) -> ReasoningResult<NodeOutcome> {
    const SYSTEM_PROMPT: &str = "Choose the anchor ontology to start reasoning from, and \
        optionally a target ontology to traverse to, from these scored candidates.";

    let top20: Vec<_> = state.ontology_candidates.iter().take(20).collect();
    let user_payload = serde_json::json!({
        "candidates": top20,
        "preferred_code": state.preferred_anchor_code,
    });
    let schema_hint = serde_json::json!({
        "input_ontology_codes": ["string"],
        "target_ontology_codes": ["string"],
    });

    let selection: AnchorSelection = invoke_typed_json(
        &deps.llm,
        "select_anchor_ontologies",
        SYSTEM_PROMPT,
        &user_payload,
        &schema_hint,
        &deps.audit_cb,
    )
    .await?;

    let chosen = selection
        .input_ontology_codes
        .first()
        .cloned()
        .or_else(|| state.ontology_candidates.first().map(|c| c.code.clone()));

    let chosen = match chosen {
        Some(code) => code,
        None => {
            return Ok(NodeOutcome::Waiting(PendingQuestion::Clarification {
                reason: "no_ontology_match".to_string(),
                payload: serde_json::json!({}),
            }))
        }
    };

    let ontology_detail = match deps.graph_tools.get_ontology_details(&chosen).await {
        Ok(detail) => detail,
        Err(_) => {
            return Ok(NodeOutcome::Waiting(PendingQuestion::Clarification {
                reason: "anchor_ontology_missing".to_string(),
                payload: serde_json::json!({ "code": chosen }),
            }))
        }
    };

    if let Some(target) = selection.target_ontology_codes.first() {
        if target != &chosen
            && state.preferred_anchor_code.is_none()
            && state.traversal_state.can_traverse_to(target)
        {
            return Ok(NodeOutcome::Waiting(PendingQuestion::TraversalConfirmation {
                from_code: chosen,
                to_code: target.clone(),
            }));
        }
    }

    deps.trace.emit(
        "select_anchor_ontologies",
        "ontology_selected",
        serde_json::json!({ "code": chosen }),
    ).await;

    state
        .plan_state
        .insert("input_ontology".to_string(), serde_json::json!(chosen));
    state.selected_ontology_code = Some(chosen);
    state.selected_ontology = Some(ontology_detail);
    Ok(NodeOutcome::Continue)
}

/// 4. `inspect_ontology`.
pub async fn inspect_ontology(state: &mut GraphState, deps: &GraphDeps<'_>) -> ReasoningResult<NodeOutcome> {
    let anchor = state
        .selected_ontology
        .clone()
        .expect("select_anchor_ontologies must run first");

    if anchor.capabilities.is_empty() && anchor.object_properties.is_empty() {
        return Ok(NodeOutcome::Waiting(PendingQuestion::Clarification {
            reason: "no_executable_resource".to_string(),
            payload: serde_json::json!({ "code": anchor.code }),
        }));
    }

    const SYSTEM_PROMPT: &str = "Given an ontology's capabilities and object properties, decide \
        which single resource to execute for the user's query.";
    let user_payload = serde_json::json!({
        "query": state.user_input,
        "capabilities": anchor.capabilities,
        "object_properties": anchor.object_properties,
    });
    let schema_hint = serde_json::json!({
        "action": "execute_capability|execute_object_property",
        "capability_code": "string?",
        "object_property_code": "string?",
        "reason": "string?",
    });

    let decision: InspectDecision = invoke_typed_json(
        &deps.llm,
        "inspect_ontology",
        SYSTEM_PROMPT,
        &user_payload,
        &schema_hint,
        &deps.audit_cb,
    )
    .await?;

    let use_capability = !anchor.capabilities.is_empty() && decision.action == InspectAction::ExecuteCapability;

    let (task_type, chosen_code) = if use_capability {
        let code = decision
            .capability_code
            .or_else(|| anchor.capabilities.first().cloned())
            .ok_or_else(|| {
                ReasoningError::Engine(EngineError::NoExecutableResource {
                    code: anchor.code.clone(),
                })
            })?;
        deps.graph_tools.get_capability_details(&code).await?;
        (TaskType::Capability, code)
    } else {
        let code = decision
            .object_property_code
            .or_else(|| anchor.object_properties.first().cloned())
            .ok_or_else(|| {
                ReasoningError::Engine(EngineError::NoExecutableResource {
                    code: anchor.code.clone(),
                })
            })?;
        deps.graph_tools.get_object_property_details(&code).await?;
        (TaskType::ObjectProperty, code)
    };

    deps.trace.emit(
        "inspect_ontology",
        "task_planned",
        serde_json::json!({ "task_type": task_type.to_string(), "code": chosen_code }),
    ).await;

    state
        .plan_state
        .insert("chosen_resource_code".to_string(), serde_json::json!(chosen_code));
    state.task_type = Some(task_type);
    Ok(NodeOutcome::Continue)
}

/// 5. `execute`.
pub async fn execute(state: &mut GraphState, deps: &GraphDeps<'_>) -> ReasoningResult<NodeOutcome> {
    let anchor = state
        .selected_ontology
        .clone()
        .expect("select_anchor_ontologies must run first");
    let task_type = state.task_type.expect("inspect_ontology must run first");
    let chosen_code = state
        .plan_state
        .get("chosen_resource_code")
        .and_then(|v| v.as_str())
        .expect("inspect_ontology must populate chosen_resource_code")
        .to_string();

    let task_payload = serde_json::json!({ "task_type": task_type.to_string(), "code": chosen_code });
    let task_id = deps.task_recorder.create(task_type, task_payload).await?;
    state.task_id = Some(task_id);

    let outcome = match task_type {
        TaskType::Capability => {
            execute_capability(
                &deps.llm,
                &state.user_input,
                &chosen_code,
                &anchor,
                deps.data_client,
                &deps.audit_cb,
            )
            .await
        }
        TaskType::ObjectProperty => {
            match deps.graph_tools.get_object_property_details(&chosen_code).await {
                Ok(object_property) => {
                    execute_object_property(
                        &deps.llm,
                        &state.user_input,
                        &object_property,
                        &anchor.code,
                        deps.graph_tools,
                        deps.data_client,
                        &deps.audit_cb,
                    )
                    .await
                }
                Err(e) => Err(e),
            }
        }
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            deps.task_recorder.mark_status(task_id, TaskStatus::Failed).await?;
            return Err(e);
        }
    };

    deps.task_recorder.mark_status(task_id, TaskStatus::Completed).await?;

    state
        .plan_state
        .insert("data_execution".to_string(), result["data_execution"].clone());
    state
        .plan_state
        .insert("execution_mode".to_string(), result["execution_mode"].clone());
    state
        .plan_state
        .insert("executor_plan".to_string(), result["executor_plan"].clone());
    state.executor_output = Some(result);

    deps.trace.emit(
        "execute",
        "task_executed",
        serde_json::json!({ "task_type": task_type.to_string(), "code": chosen_code }),
    ).await;

    Ok(NodeOutcome::Continue)
}

/// 6. `finalize`. A summary failure fails the run - it is not optional.
pub async fn finalize(state: &mut GraphState, deps: &GraphDeps<'_>) -> ReasoningResult<NodeOutcome> {
    let anchor = state
        .selected_ontology
        .clone()
        .expect("select_anchor_ontologies must run first");
    let ontology_value = serde_json::to_value(&anchor).unwrap_or_default();
    let task_value = serde_json::json!({
        "task_type": state.task_type.map(|t| t.to_string()),
        "code": state.plan_state.get("chosen_resource_code"),
    });

    let summary = summarize(
        &deps.llm,
        &state.user_input,
        &ontology_value,
        &task_value,
        &deps.audit_cb,
    )
    .await?;

    state.model_output = Some(serde_json::json!({
        "summary": summary,
        "selected_ontology": ontology_value,
        "selected_task": task_value,
        "candidate_attributes": state.attribute_candidates,
        "data_execution": state.plan_state.get("data_execution"),
        "plan_state": state.plan_state,
        "llm_route": {
            "provider": deps.llm_route.provider.to_string(),
            "model": deps.llm_route.model,
            "has_fallback": deps.llm_route.has_fallback,
        },
    }));

    Ok(NodeOutcome::Completed)
}

/// Fold an answered traversal confirmation into `traversal_state` (§4.10):
/// always record the hop and spend budget; on approval, additionally set
/// the resume token so the next `run` re-enters `select_anchor_ontologies`
/// with it as `preferred_code`.
pub fn apply_confirmation_answer(
    traversal_state: &mut reasoning_core::TraversalState,
    from_code: &str,
    to_code: &str,
    approved: bool,
) {
    if approved {
        traversal_state.record_hop(from_code, Some(to_code));
        traversal_state.approved_target_ontology_code = Some(to_code.to_string());
    } else {
        traversal_state.record_hop(from_code, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_based_keywords_dedupes_and_caps_at_eight() {
        let input = "a bb bb cc dd ee ff gg hh ii jj";
        let keywords = rule_based_keywords(input);
        assert_eq!(keywords.len(), 8);
        assert!(!keywords.contains(&"a".to_string()));
        assert_eq!(keywords.iter().filter(|k| *k == "bb").count(), 1);
    }

    #[test]
    fn apply_confirmation_answer_sets_resume_token_only_on_approval() {
        let mut state = reasoning_core::TraversalState::default();
        apply_confirmation_answer(&mut state, "anchor_a", "anchor_b", true);
        assert_eq!(state.approved_target_ontology_code, Some("anchor_b".to_string()));
        assert_eq!(state.depth, 1);

        let mut state2 = reasoning_core::TraversalState::default();
        apply_confirmation_answer(&mut state2, "anchor_a", "anchor_b", false);
        assert_eq!(state2.approved_target_ontology_code, None);
        assert_eq!(state2.depth, 1);
    }
}
