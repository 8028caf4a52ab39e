//! HTTP-backed [`GraphToolAgent`] and [`DataServiceClient`] implementations,
//! reaching the `mcp.graph.tools:call`, `mcp.data.query`, and
//! `mcp.data.group-analysis` collaborator methods (§6).
//!
//! Shaped after `reasoning_llm::OpenAiCompatibleClient`: a thin `reqwest`
//! wrapper with a request timeout, a redacting `Debug` impl, and errors
//! mapped onto the core taxonomy rather than bubbling raw `reqwest::Error`.
//! There is no dedicated "collaborator" error variant in `reasoning-core`,
//! so transport and decode failures are reported as [`StorageError::TransactionFailed`] -
//! the same bucket `reasoning-storage`'s own database calls use for "this
//! external dependency misbehaved".

use async_trait::async_trait;
use reasoning_core::{ReasoningError, ReasoningResult, StorageError};
use reasoning_graph::{
    AttributeDetail, CapabilityDetail, DataGroupAnalysisRequest, DataQueryRequest,
    DataServiceClient, GraphToolAgent, ObjectPropertyDetail, OntologyDetail, OntologyResources,
    ScoredHit, SearchParams,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

fn transport_err(collaborator: &str, e: reqwest::Error) -> ReasoningError {
    ReasoningError::Storage(StorageError::TransactionFailed {
        reason: format!("{collaborator} request failed: {e}"),
    })
}

fn decode_err(collaborator: &str, e: impl std::fmt::Display) -> ReasoningError {
    ReasoningError::Storage(StorageError::TransactionFailed {
        reason: format!("{collaborator} returned an unreadable response: {e}"),
    })
}

#[derive(Debug, Deserialize)]
struct McpEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<McpErrorBody>,
}

#[derive(Debug, Deserialize)]
struct McpErrorBody {
    message: String,
}

async fn call_method(
    client: &Client,
    base_url: &str,
    api_key: &str,
    method: &str,
    params: Value,
) -> ReasoningResult<Value> {
    let response = client
        .post(base_url)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(&json!({ "method": method, "params": params }))
        .send()
        .await
        .map_err(|e| transport_err(method, e))?;

    let status = response.status();
    let body: McpEnvelope = response
        .json()
        .await
        .map_err(|e| decode_err(method, e))?;

    if !status.is_success() {
        let message = body
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| format!("http {status}"));
        return Err(ReasoningError::Storage(StorageError::TransactionFailed {
            reason: format!("{method} failed: {message}"),
        }));
    }

    body.result
        .ok_or_else(|| decode_err(method, "response had no result field"))
}

fn search_params_json(params: &SearchParams) -> Value {
    json!({
        "query": params.query,
        "codes": params.codes,
        "top_n": params.top_n,
        "score_gap": params.score_gap,
        "w_sparse": params.w_sparse,
        "w_dense": params.w_dense,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> ReasoningResult<T> {
    serde_json::from_value(value).map_err(|e| decode_err(method, e))
}

/// Client for the eight `mcp.graph.tools:call`-dispatched tools.
pub struct HttpGraphToolAgent {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpGraphToolAgent {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> ReasoningResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
            .build()
            .map_err(|e| transport_err("http-client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn call_tool(&self, tool: &str, args: Value) -> ReasoningResult<Value> {
        call_method(
            &self.client,
            &self.base_url,
            &self.api_key,
            "mcp.graph.tools:call",
            json!({ "tool": tool, "args": args }),
        )
        .await
    }
}

impl std::fmt::Debug for HttpGraphToolAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGraphToolAgent")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl GraphToolAgent for HttpGraphToolAgent {
    async fn list_data_attributes(&self, params: &SearchParams) -> ReasoningResult<Vec<ScoredHit>> {
        let result = self
            .call_tool("graph.list_data_attributes", search_params_json(params))
            .await?;
        from_json("graph.list_data_attributes", result)
    }

    async fn list_ontologies(&self, params: &SearchParams) -> ReasoningResult<Vec<ScoredHit>> {
        let result = self
            .call_tool("graph.list_ontologies", search_params_json(params))
            .await?;
        from_json("graph.list_ontologies", result)
    }

    async fn get_data_attribute_related_ontologies(
        &self,
        attribute_code: &str,
    ) -> ReasoningResult<Vec<String>> {
        let result = self
            .call_tool(
                "graph.get_data_attribute_related_ontologies",
                json!({ "attribute_code": attribute_code }),
            )
            .await?;
        from_json("graph.get_data_attribute_related_ontologies", result)
    }

    async fn get_ontology_related_resources(
        &self,
        ontology_code: &str,
    ) -> ReasoningResult<OntologyResources> {
        let result = self
            .call_tool(
                "graph.get_ontology_related_resources",
                json!({ "ontology_code": ontology_code }),
            )
            .await?;
        from_json("graph.get_ontology_related_resources", result)
    }

    async fn get_ontology_details(&self, ontology_code: &str) -> ReasoningResult<OntologyDetail> {
        let result = self
            .call_tool(
                "graph.get_ontology_details",
                json!({ "ontology_code": ontology_code }),
            )
            .await?;
        from_json("graph.get_ontology_details", result)
    }

    async fn get_data_attribute_details(
        &self,
        attribute_code: &str,
    ) -> ReasoningResult<AttributeDetail> {
        let result = self
            .call_tool(
                "graph.get_data_attribute_details",
                json!({ "attribute_code": attribute_code }),
            )
            .await?;
        from_json("graph.get_data_attribute_details", result)
    }

    async fn get_object_property_details(&self, code: &str) -> ReasoningResult<ObjectPropertyDetail> {
        let result = self
            .call_tool("graph.get_object_property_details", json!({ "code": code }))
            .await?;
        from_json("graph.get_object_property_details", result)
    }

    async fn get_capability_details(&self, code: &str) -> ReasoningResult<CapabilityDetail> {
        let result = self
            .call_tool("graph.get_capability_details", json!({ "code": code }))
            .await?;
        from_json("graph.get_capability_details", result)
    }
}

/// Client for `mcp.data.query` and `mcp.data.group-analysis`.
pub struct HttpDataServiceClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpDataServiceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> ReasoningResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
            .build()
            .map_err(|e| transport_err("http-client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

impl std::fmt::Debug for HttpDataServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataServiceClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl DataServiceClient for HttpDataServiceClient {
    async fn query(&self, request: &DataQueryRequest) -> ReasoningResult<Value> {
        call_method(
            &self.client,
            &self.base_url,
            &self.api_key,
            "mcp.data.query",
            serde_json::to_value(request).map_err(|e| decode_err("mcp.data.query", e))?,
        )
        .await
    }

    async fn group_analysis(&self, request: &DataGroupAnalysisRequest) -> ReasoningResult<Value> {
        call_method(
            &self.client,
            &self.base_url,
            &self.api_key,
            "mcp.data.group-analysis",
            serde_json::to_value(request).map_err(|e| decode_err("mcp.data.group-analysis", e))?,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let agent = HttpGraphToolAgent::new("https://mcp.example/rpc", "sk-test", 5_000).unwrap();
        let debug = format!("{agent:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("sk-test"));

        let data_client = HttpDataServiceClient::new("https://mcp.example/rpc", "sk-test", 5_000).unwrap();
        let debug = format!("{data_client:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn search_params_json_carries_all_fields() {
        let mut params = SearchParams::new("mobile phone");
        params.codes = Some(vec!["user_profile".to_string()]);
        let value = search_params_json(&params);
        assert_eq!(value["query"], "mobile phone");
        assert_eq!(value["codes"][0], "user_profile");
    }
}
