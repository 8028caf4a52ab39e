//! The Graph Tool Agent: a typed client facade over the (out-of-scope)
//! ontology metadata surface, plus an in-memory fake for tests.
//!
//! Eight named tools, dispatched either directly through the trait or via
//! [`call_tool`] for callers that only have a tool name and a JSON
//! argument bag (mirroring the `mcp.graph.tools:call` wire contract).

use async_trait::async_trait;
use reasoning_core::{ReasoningError, ReasoningResult, StorageError, ValidationError};
use reasoning_retrieval::{score_candidates, top_n_with_gap, Candidate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters shared by the two search-style tools
/// (`list_data_attributes`, `list_ontologies`).
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub codes: Option<Vec<String>>,
    pub top_n: usize,
    pub score_gap: f64,
    pub w_sparse: f64,
    pub w_dense: f64,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            codes: None,
            top_n: 20,
            score_gap: 0.0,
            w_sparse: reasoning_retrieval::DEFAULT_W_SPARSE,
            w_dense: reasoning_retrieval::DEFAULT_W_DENSE,
        }
    }
}

fn parse_search_params(args: &Value) -> SearchParams {
    SearchParams {
        query: args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        codes: args.get("codes").and_then(Value::as_array).map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        }),
        top_n: args.get("top_n").and_then(Value::as_u64).unwrap_or(20) as usize,
        score_gap: args.get("score_gap").and_then(Value::as_f64).unwrap_or(0.0),
        w_sparse: args
            .get("w_sparse")
            .and_then(Value::as_f64)
            .unwrap_or(reasoning_retrieval::DEFAULT_W_SPARSE),
        w_dense: args
            .get("w_dense")
            .and_then(Value::as_f64)
            .unwrap_or(reasoning_retrieval::DEFAULT_W_DENSE),
    }
}

fn require_code(args: &Value, field: &str) -> ReasoningResult<String> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ReasoningError::Validation(ValidationError::RequiredFieldMissing {
                field: field.to_string(),
            })
        })
}

/// One scored hit returned by a search tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredHit {
    pub code: String,
    pub score: f64,
}

/// Per-ontology attribute-to-field binding used by executors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDetail {
    pub attribute_id: String,
    pub code: String,
    pub name: String,
    pub data_type: String,
    pub description: Option<String>,
    pub field_name: String,
}

/// Full detail of an ontology: its backing class, attached capabilities
/// and object properties, and its attribute catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OntologyDetail {
    pub code: String,
    pub name: String,
    pub class_id: String,
    pub capabilities: Vec<String>,
    pub object_properties: Vec<String>,
    pub attribute_catalog: Vec<AttributeDetail>,
}

/// A capability's execution defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityDetail {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub default_mode: String,
}

/// An object property (relation) with its domain/range ontology codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectPropertyDetail {
    pub code: String,
    pub name: String,
    pub domain: Vec<String>,
    pub range: Vec<String>,
}

/// The attribute catalog and attached resource codes for one ontology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OntologyResources {
    pub attribute_catalog: Vec<AttributeDetail>,
    pub capabilities: Vec<String>,
    pub object_properties: Vec<String>,
}

/// The eight named tools exposed by the metadata/graph service.
#[async_trait]
pub trait GraphToolAgent: Send + Sync {
    async fn list_data_attributes(&self, params: &SearchParams) -> ReasoningResult<Vec<ScoredHit>>;
    async fn list_ontologies(&self, params: &SearchParams) -> ReasoningResult<Vec<ScoredHit>>;
    async fn get_data_attribute_related_ontologies(
        &self,
        attribute_code: &str,
    ) -> ReasoningResult<Vec<String>>;
    async fn get_ontology_related_resources(
        &self,
        ontology_code: &str,
    ) -> ReasoningResult<OntologyResources>;
    async fn get_ontology_details(&self, ontology_code: &str) -> ReasoningResult<OntologyDetail>;
    async fn get_data_attribute_details(
        &self,
        attribute_code: &str,
    ) -> ReasoningResult<AttributeDetail>;
    async fn get_object_property_details(
        &self,
        code: &str,
    ) -> ReasoningResult<ObjectPropertyDetail>;
    async fn get_capability_details(&self, code: &str) -> ReasoningResult<CapabilityDetail>;
}

/// Dynamic dispatch over a tool name and a JSON argument bag, for callers
/// (trace auditing, generic MCP plumbing) that only have the name string.
/// Fails `VALIDATION` for any name outside the eight above.
pub async fn call_tool(
    agent: &dyn GraphToolAgent,
    name: &str,
    args: Value,
) -> ReasoningResult<Value> {
    let result = match name {
        "graph.list_data_attributes" => {
            serde_json::to_value(agent.list_data_attributes(&parse_search_params(&args)).await?)
        }
        "graph.list_ontologies" => {
            serde_json::to_value(agent.list_ontologies(&parse_search_params(&args)).await?)
        }
        "graph.get_data_attribute_related_ontologies" => {
            let code = require_code(&args, "attribute_code")?;
            serde_json::to_value(agent.get_data_attribute_related_ontologies(&code).await?)
        }
        "graph.get_ontology_related_resources" => {
            let code = require_code(&args, "ontology_code")?;
            serde_json::to_value(agent.get_ontology_related_resources(&code).await?)
        }
        "graph.get_ontology_details" => {
            let code = require_code(&args, "ontology_code")?;
            serde_json::to_value(agent.get_ontology_details(&code).await?)
        }
        "graph.get_data_attribute_details" => {
            let code = require_code(&args, "attribute_code")?;
            serde_json::to_value(agent.get_data_attribute_details(&code).await?)
        }
        "graph.get_object_property_details" => {
            let code = require_code(&args, "code")?;
            serde_json::to_value(agent.get_object_property_details(&code).await?)
        }
        "graph.get_capability_details" => {
            let code = require_code(&args, "code")?;
            serde_json::to_value(agent.get_capability_details(&code).await?)
        }
        other => {
            return Err(ReasoningError::Validation(ValidationError::InvalidValue {
                field: "name".to_string(),
                reason: format!("unknown tool: {other}"),
            }))
        }
    };

    result.map_err(|e: serde_json::Error| {
        ReasoningError::Validation(ValidationError::InvalidValue {
            field: "result".to_string(),
            reason: e.to_string(),
        })
    })
}

fn not_found(entity: &str, id: &str) -> ReasoningError {
    ReasoningError::Storage(StorageError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    })
}

fn search_candidates(
    items: Vec<(String, String)>,
    params: &SearchParams,
) -> Vec<ScoredHit> {
    let candidates: Vec<Candidate> = items
        .into_iter()
        .filter(|(code, _)| {
            params
                .codes
                .as_ref()
                .map(|allowed| allowed.contains(code))
                .unwrap_or(true)
        })
        .map(|(code, search_text)| Candidate {
            code,
            search_text,
            embedding: None,
        })
        .collect();

    let scored = score_candidates(
        &params.query,
        None,
        &candidates,
        None,
        params.w_sparse,
        params.w_dense,
    );
    top_n_with_gap(&scored, params.top_n, params.score_gap)
        .into_iter()
        .map(|s| ScoredHit {
            code: s.code,
            score: s.score,
        })
        .collect()
}

/// In-memory [`GraphToolAgent`] backed by fixture data, so the full state
/// graph is exercisable without a live ontology service.
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// A fixture ontology plus the text it's matched against in search.
    #[derive(Debug, Clone)]
    pub struct FixtureOntology {
        pub detail: OntologyDetail,
        pub search_text: String,
    }

    /// A fixture attribute plus the ontologies it's bound to.
    #[derive(Debug, Clone)]
    pub struct FixtureAttribute {
        pub detail: AttributeDetail,
        pub search_text: String,
        pub related_ontology_codes: Vec<String>,
    }

    #[derive(Default)]
    pub struct InMemoryGraphToolAgent {
        ontologies: RwLock<HashMap<String, FixtureOntology>>,
        attributes: RwLock<HashMap<String, FixtureAttribute>>,
        capabilities: RwLock<HashMap<String, CapabilityDetail>>,
        object_properties: RwLock<HashMap<String, ObjectPropertyDetail>>,
    }

    impl InMemoryGraphToolAgent {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_ontology(&self, ontology: FixtureOntology) {
            self.ontologies
                .write()
                .unwrap()
                .insert(ontology.detail.code.clone(), ontology);
        }

        pub fn add_attribute(&self, attribute: FixtureAttribute) {
            self.attributes
                .write()
                .unwrap()
                .insert(attribute.detail.code.clone(), attribute);
        }

        pub fn add_capability(&self, capability: CapabilityDetail) {
            self.capabilities
                .write()
                .unwrap()
                .insert(capability.code.clone(), capability);
        }

        pub fn add_object_property(&self, object_property: ObjectPropertyDetail) {
            self.object_properties
                .write()
                .unwrap()
                .insert(object_property.code.clone(), object_property);
        }
    }

    #[async_trait]
    impl GraphToolAgent for InMemoryGraphToolAgent {
        async fn list_data_attributes(
            &self,
            params: &SearchParams,
        ) -> ReasoningResult<Vec<ScoredHit>> {
            let items = self
                .attributes
                .read()
                .unwrap()
                .values()
                .map(|a| (a.detail.code.clone(), a.search_text.clone()))
                .collect();
            Ok(search_candidates(items, params))
        }

        async fn list_ontologies(&self, params: &SearchParams) -> ReasoningResult<Vec<ScoredHit>> {
            let items = self
                .ontologies
                .read()
                .unwrap()
                .values()
                .map(|o| (o.detail.code.clone(), o.search_text.clone()))
                .collect();
            Ok(search_candidates(items, params))
        }

        async fn get_data_attribute_related_ontologies(
            &self,
            attribute_code: &str,
        ) -> ReasoningResult<Vec<String>> {
            self.attributes
                .read()
                .unwrap()
                .get(attribute_code)
                .map(|a| a.related_ontology_codes.clone())
                .ok_or_else(|| not_found("data_attribute", attribute_code))
        }

        async fn get_ontology_related_resources(
            &self,
            ontology_code: &str,
        ) -> ReasoningResult<OntologyResources> {
            self.ontologies
                .read()
                .unwrap()
                .get(ontology_code)
                .map(|o| OntologyResources {
                    attribute_catalog: o.detail.attribute_catalog.clone(),
                    capabilities: o.detail.capabilities.clone(),
                    object_properties: o.detail.object_properties.clone(),
                })
                .ok_or_else(|| not_found("ontology", ontology_code))
        }

        async fn get_ontology_details(&self, ontology_code: &str) -> ReasoningResult<OntologyDetail> {
            self.ontologies
                .read()
                .unwrap()
                .get(ontology_code)
                .map(|o| o.detail.clone())
                .ok_or_else(|| not_found("ontology", ontology_code))
        }

        async fn get_data_attribute_details(
            &self,
            attribute_code: &str,
        ) -> ReasoningResult<AttributeDetail> {
            self.attributes
                .read()
                .unwrap()
                .get(attribute_code)
                .map(|a| a.detail.clone())
                .ok_or_else(|| not_found("data_attribute", attribute_code))
        }

        async fn get_object_property_details(
            &self,
            code: &str,
        ) -> ReasoningResult<ObjectPropertyDetail> {
            self.object_properties
                .read()
                .unwrap()
                .get(code)
                .cloned()
                .ok_or_else(|| not_found("object_property", code))
        }

        async fn get_capability_details(&self, code: &str) -> ReasoningResult<CapabilityDetail> {
            self.capabilities
                .read()
                .unwrap()
                .get(code)
                .cloned()
                .ok_or_else(|| not_found("capability", code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FixtureAttribute, FixtureOntology, InMemoryGraphToolAgent};
    use super::*;

    fn fixture_agent() -> InMemoryGraphToolAgent {
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
            search_text: "user profile mobile phone".to_string(),
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

    #[tokio::test]
    async fn list_data_attributes_scores_against_query() {
        let agent = fixture_agent();
        let params = SearchParams::new("mobile phone");
        let hits = agent.list_data_attributes(&params).await.unwrap();
        assert_eq!(hits[0].code, "mobile");
        assert!(hits[0].score > 0.0);
    }

    #[tokio::test]
    async fn get_ontology_details_returns_fixture() {
        let agent = fixture_agent();
        let detail = agent.get_ontology_details("user_profile").await.unwrap();
        assert_eq!(detail.class_id, "class-user-profile");
    }

    #[tokio::test]
    async fn get_ontology_details_missing_code_is_not_found() {
        let agent = fixture_agent();
        let err = agent.get_ontology_details("does_not_exist").await.unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Storage(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn call_tool_rejects_unknown_name() {
        let agent = fixture_agent();
        let err = call_tool(&agent, "graph.delete_everything", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::Validation(_)));
    }

    #[tokio::test]
    async fn call_tool_dispatches_search_tool_by_name() {
        let agent = fixture_agent();
        let result = call_tool(
            &agent,
            "graph.list_ontologies",
            serde_json::json!({"query": "user profile"}),
        )
        .await
        .unwrap();
        assert_eq!(result[0]["code"], "user_profile");
    }
}
