//! Axum middleware wrapping [`crate::auth::authenticate`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: Arc<AuthConfig>) -> Self {
        Self { auth_config }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let authorization = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());
    let tenant_id_header = request
        .headers()
        .get("x-tenant-id")
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&state.auth_config, authorization, tenant_id_header)
        .map_err(AuthMiddlewareError)?;

    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Typed extractor: `AuthExtractor(auth)` in a handler signature requires
/// `auth_middleware` to have run on the route.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::bad_request(
                    "AuthContext missing from request extensions; is auth_middleware applied?",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub fn extract_auth_context(request: &Request) -> Result<&AuthContext, ApiError> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::bad_request("auth context missing from request"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use reasoning_core::EntityIdType;
    use reasoning_core::TenantId;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let auth_config = Arc::new(AuthConfig { tokens: vec!["secret".to_string()] });
        let state = AuthMiddlewareState::new(auth_config);
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    #[tokio::test]
    async fn rejects_missing_bearer_token() {
        let app = test_app();
        let tenant_id = TenantId::now_v7();
        let request = axum::http::Request::builder()
            .uri("/protected")
            .header("x-tenant-id", tenant_id.to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_valid_bearer_and_tenant_header() {
        let app = test_app();
        let tenant_id = TenantId::now_v7();
        let request = axum::http::Request::builder()
            .uri("/protected")
            .header("authorization", "Bearer secret")
            .header("x-tenant-id", tenant_id.to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
