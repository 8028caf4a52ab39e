//! REST API routes module: the reasoning surface, tenant LLM config, and
//! health checks (§6), nested under `/api/v1` plus the OpenAPI endpoints.

pub mod health;
pub mod sessions;
pub mod tenant_llm_config;

use axum::{response::IntoResponse, routing::get, Json, Router};
use utoipa::OpenApi;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub use sessions::create_router as sessions_router;
pub use tenant_llm_config::create_router as tenant_llm_config_router;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(feature = "openapi")]
async fn openapi_yaml() -> impl IntoResponse {
    use axum::http::{header, StatusCode};

    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/yaml")],
            yaml,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("failed to generate YAML: {e}"),
        ),
    }
}

/// Create the complete API router: `/api/v1/reasoning/*`, tenant LLM config,
/// unauthenticated health checks, and OpenAPI docs.
pub fn create_api_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/reasoning", sessions::create_router())
        .nest("/tenants", tenant_llm_config::create_router())
        .layer(axum::middleware::from_fn_with_state(
            crate::middleware::AuthMiddlewareState::new(state.auth_config.clone()),
            crate::middleware::auth_middleware,
        ));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router())
        .route("/openapi.json", get(openapi_json))
        .with_state(state.clone());

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.yaml", get(openapi_yaml));
    }

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()),
        );
    }

    let rate_limit_state = crate::middleware::RateLimitState::new(state.api_config.clone());
    router.layer(axum::middleware::from_fn_with_state(
        rate_limit_state,
        crate::middleware::rate_limit_middleware,
    ))
}

#[cfg(test)]
mod tests {
    #[test]
    fn route_modules_compile() {
        let _ = super::sessions::create_router;
        let _ = super::tenant_llm_config::create_router;
        let _ = super::health::create_router;
    }
}
