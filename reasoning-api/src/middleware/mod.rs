//! Axum middleware: bearer/tenant auth and per-key rate limiting.
//!
//! # Middleware order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/reasoning/sessions", post(handler))
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//! ```

mod auth;
mod rate_limit;

pub use auth::{auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
pub use rate_limit::{rate_limit_middleware, RateLimitError, RateLimitKey, RateLimitState};
