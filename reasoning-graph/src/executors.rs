//! Capability and object-property executors (§4.9).
//!
//! Both share a helper that normalizes the LLM's raw plan into `mode`,
//! coerced `filters`, and page bounds before building a data-service
//! request.

use crate::data_client::{
    DataFilter, DataGroupAnalysisRequest, DataQueryRequest, DataServiceClient, FilterOp,
    MetricSpec, SortOrder,
};
use crate::llm::{invoke_plan_json, LlmRouting};
use crate::tools::{AttributeDetail, GraphToolAgent, ObjectPropertyDetail, OntologyDetail};
use crate::types::DataPlan;
use reasoning_core::{EngineError, ReasoningError, ReasoningResult};
use reasoning_llm::AuditCallback;
use serde_json::Value;
use std::collections::HashSet;

/// A normalized plan, shared shape across both executors.
#[derive(Debug, Clone)]
pub struct NormalizedPlan {
    pub mode: PlanMode,
    pub filters: Vec<DataFilter>,
    pub page: i64,
    pub page_size: i64,
    pub group_by: Vec<String>,
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    Query,
    GroupAnalysis,
}

fn coerce_op(raw: &str) -> FilterOp {
    match raw {
        "like" => FilterOp::Like,
        "in" => FilterOp::In,
        _ => FilterOp::Eq,
    }
}

/// Normalize a raw LLM plan per §4.9: `mode`, filters (op coerced to `eq`
/// when unknown, empty `field` dropped), `page`/`page_size` floored at 1,
/// `group_by` defaulted to the first catalog field when empty and
/// `mode=group-analysis`.
pub fn normalize_plan(raw: &DataPlan, attribute_catalog: &[AttributeDetail]) -> NormalizedPlan {
    let mode = match raw.mode.as_deref() {
        Some("group-analysis") => PlanMode::GroupAnalysis,
        _ => PlanMode::Query,
    };

    let filters = raw
        .filters
        .iter()
        .filter(|f| !f.field.trim().is_empty())
        .map(|f| DataFilter {
            field: f.field.clone(),
            op: coerce_op(&f.op),
            value: f.value.clone(),
        })
        .collect();

    let page = raw.page.unwrap_or(1).max(1);
    let page_size = raw.page_size.unwrap_or(20).max(1);

    let mut group_by = raw.group_by.clone();
    if mode == PlanMode::GroupAnalysis && group_by.is_empty() {
        if let Some(first) = attribute_catalog.first() {
            group_by.push(first.field_name.clone());
        }
    }

    let metrics = raw
        .metrics
        .iter()
        .map(|m| MetricSpec {
            agg: m.agg.clone(),
            field: m.field.clone(),
            alias: m.alias.clone(),
        })
        .collect();

    NormalizedPlan {
        mode,
        filters,
        page,
        page_size,
        group_by,
        metrics,
    }
}

async fn run_plan(
    data_client: &dyn DataServiceClient,
    class_id: &str,
    plan: &NormalizedPlan,
) -> ReasoningResult<Value> {
    match plan.mode {
        PlanMode::Query => {
            data_client
                .query(&DataQueryRequest {
                    class_id: class_id.to_string(),
                    filters: plan.filters.clone(),
                    page: plan.page,
                    page_size: plan.page_size,
                    sort_field: None,
                    sort_order: SortOrder::Asc,
                })
                .await
        }
        PlanMode::GroupAnalysis => {
            data_client
                .group_analysis(&DataGroupAnalysisRequest {
                    class_id: class_id.to_string(),
                    group_by: plan.group_by.clone(),
                    metrics: plan.metrics.clone(),
                    filters: plan.filters.clone(),
                    page: plan.page,
                    page_size: plan.page_size,
                    sort_by: None,
                    sort_order: SortOrder::Asc,
                })
                .await
        }
    }
}

/// Ask the LLM for a plan using the capability detail, the anchor ontology,
/// and its attribute catalog; execute it; return the §4.9 result shape.
pub async fn execute_capability(
    routing: &LlmRouting<'_>,
    query: &str,
    capability_code: &str,
    anchor: &OntologyDetail,
    data_client: &dyn DataServiceClient,
    audit_cb: &AuditCallback,
) -> ReasoningResult<Value> {
    let capability = anchor
        .capabilities
        .iter()
        .find(|c| c.as_str() == capability_code)
        .ok_or_else(|| {
            ReasoningError::Engine(EngineError::NoExecutableResource {
                code: capability_code.to_string(),
            })
        })?;

    let system_prompt = "Given a capability, the anchor ontology, and its attribute catalog, \
        produce a data query or group-analysis plan as JSON.";
    let user_payload = serde_json::json!({
        "query": query,
        "capability_code": capability,
        "anchor_ontology": anchor,
        "attribute_catalog": anchor.attribute_catalog,
    });
    let schema_hint = serde_json::json!({
        "mode": "query|group-analysis",
        "filters": [{"field": "string", "op": "eq|like|in", "value": "any"}],
        "page": "number", "page_size": "number",
        "group_by": ["string"], "metrics": [{"agg": "string", "field": "string?", "alias": "string?"}],
    });

    let raw_plan: DataPlan = invoke_plan_json(
        routing,
        "execute_capability",
        system_prompt,
        &user_payload,
        &schema_hint,
        audit_cb,
    )
    .await?;
    let plan = normalize_plan(&raw_plan, &anchor.attribute_catalog);
    let data_execution = run_plan(data_client, &anchor.class_id, &plan).await?;

    Ok(serde_json::json!({
        "executor_type": "capability",
        "execution_mode": plan_mode_str(plan.mode),
        "executor_plan": raw_plan,
        "data_request": {
            "class_id": anchor.class_id,
            "filters": plan.filters,
            "page": plan.page,
            "page_size": plan.page_size,
        },
        "data_execution": data_execution,
    }))
}

fn plan_mode_str(mode: PlanMode) -> &'static str {
    match mode {
        PlanMode::Query => "query",
        PlanMode::GroupAnalysis => "group-analysis",
    }
}

/// Compute target-ontology candidates (`domain ∪ range` minus the current
/// ontology), ask the LLM to pick one and plan the query against its
/// catalog, then execute. Fails `VALIDATION` when no candidate exists.
pub async fn execute_object_property(
    routing: &LlmRouting<'_>,
    query: &str,
    object_property: &ObjectPropertyDetail,
    anchor_code: &str,
    graph_tools: &dyn GraphToolAgent,
    data_client: &dyn DataServiceClient,
    audit_cb: &AuditCallback,
) -> ReasoningResult<Value> {
    let candidates: Vec<String> = object_property
        .domain
        .iter()
        .chain(object_property.range.iter())
        .filter(|code| code.as_str() != anchor_code)
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    if candidates.is_empty() {
        return Err(ReasoningError::Engine(EngineError::NoTargetOntologyCandidates {
            code: object_property.code.clone(),
        }));
    }

    let system_prompt = "Given an object property, its candidate target ontologies, and the \
        user's query, pick one target ontology code and produce a data plan against its \
        attribute catalog.";
    let user_payload = serde_json::json!({
        "query": query,
        "object_property": object_property,
        "target_ontology_candidates": candidates,
    });
    let schema_hint = serde_json::json!({
        "target_ontology_code": "string",
        "mode": "query|group-analysis",
        "filters": [{"field": "string", "op": "eq|like|in", "value": "any"}],
        "page": "number", "page_size": "number",
        "group_by": ["string"], "metrics": [{"agg": "string", "field": "string?", "alias": "string?"}],
    });

    let raw_plan: DataPlan = invoke_plan_json(
        routing,
        "execute_object_property",
        system_prompt,
        &user_payload,
        &schema_hint,
        audit_cb,
    )
    .await?;

    let target_code = raw_plan
        .target_ontology_code
        .clone()
        .filter(|c| candidates.contains(c))
        .unwrap_or_else(|| candidates[0].clone());

    let target_ontology = graph_tools.get_ontology_details(&target_code).await?;
    let plan = normalize_plan(&raw_plan, &target_ontology.attribute_catalog);
    let data_execution = run_plan(data_client, &target_ontology.class_id, &plan).await?;

    Ok(serde_json::json!({
        "executor_type": "object_property",
        "execution_mode": plan_mode_str(plan.mode),
        "executor_plan": raw_plan,
        "data_request": {
            "class_id": target_ontology.class_id,
            "filters": plan.filters,
            "page": plan.page,
            "page_size": plan.page_size,
        },
        "data_execution": data_execution,
        "target_ontology": target_ontology,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AttributeDetail;

    fn catalog() -> Vec<AttributeDetail> {
        vec![AttributeDetail {
            attribute_id: "attr-1".to_string(),
            code: "mobile".to_string(),
            name: "Mobile".to_string(),
            data_type: "string".to_string(),
            description: None,
            field_name: "mobile_number".to_string(),
        }]
    }

    #[test]
    fn normalize_plan_coerces_unknown_op_and_drops_empty_field() {
        let raw = DataPlan {
            mode: Some("query".to_string()),
            filters: vec![
                crate::types::RawFilter {
                    field: "mobile".to_string(),
                    op: "contains".to_string(),
                    value: serde_json::json!("123"),
                },
                crate::types::RawFilter {
                    field: "".to_string(),
                    op: "eq".to_string(),
                    value: serde_json::json!("x"),
                },
            ],
            page: Some(0),
            page_size: Some(0),
            group_by: vec![],
            metrics: vec![],
            target_ontology_code: None,
        };
        let plan = normalize_plan(&raw, &catalog());
        assert_eq!(plan.filters.len(), 1);
        assert_eq!(plan.filters[0].op, FilterOp::Eq);
        assert_eq!(plan.page, 1);
        assert_eq!(plan.page_size, 1);
    }

    #[test]
    fn normalize_plan_defaults_group_by_to_first_catalog_field() {
        let raw = DataPlan {
            mode: Some("group-analysis".to_string()),
            ..Default::default()
        };
        let plan = normalize_plan(&raw, &catalog());
        assert_eq!(plan.mode, PlanMode::GroupAnalysis);
        assert_eq!(plan.group_by, vec!["mobile_number".to_string()]);
    }
}
