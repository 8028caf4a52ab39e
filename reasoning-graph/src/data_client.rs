//! The data service: `mcp.data.query` and `mcp.data.group-analysis`.
//!
//! Like the [`crate::tools::GraphToolAgent`], the executors are clients of
//! an out-of-scope data surface; this module is their typed facade plus an
//! in-memory fake for tests.

use async_trait::async_trait;
use reasoning_core::ReasoningResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Like,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Asc
    }
}

/// A single normalized filter clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// A normalized aggregation for `group-analysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSpec {
    pub agg: String,
    pub field: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQueryRequest {
    pub class_id: String,
    pub filters: Vec<DataFilter>,
    pub page: i64,
    pub page_size: i64,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGroupAnalysisRequest {
    pub class_id: String,
    pub group_by: Vec<String>,
    pub metrics: Vec<MetricSpec>,
    pub filters: Vec<DataFilter>,
    pub page: i64,
    pub page_size: i64,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

/// Client for the two data-service operations the executors call.
#[async_trait]
pub trait DataServiceClient: Send + Sync {
    async fn query(&self, request: &DataQueryRequest) -> ReasoningResult<Value>;
    async fn group_analysis(&self, request: &DataGroupAnalysisRequest) -> ReasoningResult<Value>;
}

/// In-memory [`DataServiceClient`] returning canned rows per `class_id`,
/// for exercising the executors without a live data service.
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryDataServiceClient {
        rows_by_class: RwLock<HashMap<String, Vec<Value>>>,
    }

    impl InMemoryDataServiceClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, class_id: impl Into<String>, rows: Vec<Value>) {
            self.rows_by_class
                .write()
                .unwrap()
                .insert(class_id.into(), rows);
        }
    }

    #[async_trait]
    impl DataServiceClient for InMemoryDataServiceClient {
        async fn query(&self, request: &DataQueryRequest) -> ReasoningResult<Value> {
            let rows = self
                .rows_by_class
                .read()
                .unwrap()
                .get(&request.class_id)
                .cloned()
                .unwrap_or_default();
            Ok(serde_json::json!({
                "items": rows,
                "page": request.page,
                "page_size": request.page_size,
                "total": rows.len(),
            }))
        }

        async fn group_analysis(&self, request: &DataGroupAnalysisRequest) -> ReasoningResult<Value> {
            let rows = self
                .rows_by_class
                .read()
                .unwrap()
                .get(&request.class_id)
                .cloned()
                .unwrap_or_default();
            Ok(serde_json::json!({
                "groups": rows,
                "group_by": request.group_by,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::InMemoryDataServiceClient;
    use super::*;

    #[tokio::test]
    async fn query_returns_seeded_rows_for_class() {
        let client = InMemoryDataServiceClient::new();
        client.seed("user_profile", vec![serde_json::json!({"mobile": "123"})]);
        let response = client
            .query(&DataQueryRequest {
                class_id: "user_profile".to_string(),
                filters: vec![],
                page: 1,
                page_size: 20,
                sort_field: None,
                sort_order: SortOrder::Asc,
            })
            .await
            .unwrap();
        assert_eq!(response["total"], 1);
    }

    #[tokio::test]
    async fn query_on_unknown_class_returns_empty() {
        let client = InMemoryDataServiceClient::new();
        let response = client
            .query(&DataQueryRequest {
                class_id: "nothing".to_string(),
                filters: vec![],
                page: 1,
                page_size: 20,
                sort_field: None,
                sort_order: SortOrder::Asc,
            })
            .await
            .unwrap();
        assert_eq!(response["total"], 0);
    }
}
