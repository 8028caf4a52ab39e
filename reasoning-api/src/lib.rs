//! reasoning-api - the HTTP boundary for the reasoning orchestration
//! service: REST routes (§6), bearer/tenant auth, fixed-window rate
//! limiting, and structured-logging bootstrap (§10.4).
//!
//! `reasoning-core`/`reasoning-graph`/`reasoning-storage` carry the engine
//! itself; this crate only wires requests to it.

pub mod auth;
pub mod config;
pub mod error;
pub mod macros;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use auth::{authenticate, AuthConfig, AuthContext};
pub use config::{ApiConfig, CollaboratorConfig};
pub use error::{ApiError, ApiResult};
pub use middleware::{
    auth_middleware, extract_auth_context, rate_limit_middleware, AuthExtractor,
    AuthMiddlewareState, RateLimitKey, RateLimitState,
};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use telemetry::{init_tracer, shutdown_tracer, TelemetryConfig};
