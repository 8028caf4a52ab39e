//! The HTTP boundary's error type.
//!
//! `reasoning-core` already carries the full error taxonomy and its
//! code/HTTP-status mapping (§7) via [`reasoning_core::ReasoningError::error_code`].
//! `ApiError` only adds what's specific to being an HTTP response: the
//! `trace_id` to echo back, and the `{code, message, data, trace_id}`
//! envelope shape every response (success or failure) uses (§6).

use axum::{http::StatusCode, response::IntoResponse, Json};
use reasoning_core::ReasoningError;
use serde::Serialize;
use serde_json::Value;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub code: i32,
    pub http_status: StatusCode,
    pub message: String,
    pub trace_id: Option<String>,
}

impl ApiError {
    pub fn from_reasoning_error(err: ReasoningError, trace_id: Option<String>) -> Self {
        let code = err.error_code();
        Self {
            code: code.code,
            http_status: StatusCode::from_u16(code.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
            trace_id,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            code: 1001,
            http_status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            trace_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: 1001,
            http_status: StatusCode::BAD_REQUEST,
            message: message.into(),
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        if self.trace_id.is_none() {
            self.trace_id = trace_id;
        }
        self
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    code: i32,
    message: String,
    data: T,
    trace_id: Option<String>,
}

/// Build a success envelope: `code: 0`, `data` holding the handler's payload.
pub fn ok_envelope<T: Serialize>(data: T, trace_id: Option<String>) -> Json<Value> {
    Json(serde_json::json!({
        "code": 0,
        "message": "ok",
        "data": data,
        "trace_id": trace_id,
    }))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Envelope {
            code: self.code,
            message: self.message,
            data: Value::Null,
            trace_id: self.trace_id,
        };
        (self.http_status, Json(body)).into_response()
    }
}

impl From<ReasoningError> for ApiError {
    fn from(err: ReasoningError) -> Self {
        Self::from_reasoning_error(err, None)
    }
}
