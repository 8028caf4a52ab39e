//! Health check endpoints. No authentication required.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use reasoning_storage::ReasoningRepository;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub database_ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
}

pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

pub async fn liveness() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy", details: None })
}

pub async fn readiness(
    State(repo): State<ReasoningRepository>,
    State(start_time): State<std::time::Instant>,
) -> impl IntoResponse {
    let database_ok = repo.get_system_runtime_config().await.is_ok();
    let status = if database_ok { "healthy" } else { "unhealthy" };
    let response = HealthResponse {
        status,
        details: Some(HealthDetails {
            database_ok,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };
    let status_code = if database_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(response))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
