//! Shared application state for Axum routers.

use std::sync::Arc;

use axum::extract::FromRef;
use reasoning_core::ReasoningConfig;
use reasoning_storage::{HttpDataServiceClient, HttpGraphToolAgent, ReasoningRepository, RuntimeConfigCache, TenantConfigResolver};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub repo: ReasoningRepository,
    pub runtime_config: Arc<RuntimeConfigCache>,
    pub tenant_config: Arc<TenantConfigResolver>,
    pub graph_tools: Arc<HttpGraphToolAgent>,
    pub data_client: Arc<HttpDataServiceClient>,
    pub reasoning_config: Arc<ReasoningConfig>,
    pub api_config: Arc<ApiConfig>,
    pub auth_config: Arc<AuthConfig>,
    pub start_time: std::time::Instant,
}

crate::impl_from_ref!(ReasoningRepository, repo);
crate::impl_from_ref!(Arc<RuntimeConfigCache>, runtime_config);
crate::impl_from_ref!(Arc<TenantConfigResolver>, tenant_config);
crate::impl_from_ref!(Arc<HttpGraphToolAgent>, graph_tools);
crate::impl_from_ref!(Arc<HttpDataServiceClient>, data_client);
crate::impl_from_ref!(Arc<ReasoningConfig>, reasoning_config);
crate::impl_from_ref!(Arc<ApiConfig>, api_config);
crate::impl_from_ref!(Arc<AuthConfig>, auth_config);
crate::impl_from_ref!(std::time::Instant, start_time);
