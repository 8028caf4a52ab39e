//! Audit callback plumbing for LLM invocations.
//!
//! Every call site through [`crate::invoke_json`] or
//! [`crate::summarize_with_context`] invokes the callback exactly twice:
//! once before dispatch (`PromptSent`) and once after, success or failure
//! (`ResponseReceived`). Callback errors are swallowed - an audit sink must
//! never be able to fail a reasoning run.

use std::fmt;
use std::sync::Arc;

/// One of the two audit events emitted per LLM call.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// Emitted before the request is dispatched.
    PromptSent {
        provider: String,
        model: String,
        system_prompt: Option<String>,
        user_payload: serde_json::Value,
    },
    /// Emitted after the request completes, whether it succeeded or not.
    ResponseReceived {
        provider: String,
        model: String,
        content: Option<String>,
        error: Option<String>,
        fallback_used: bool,
    },
}

/// A callback invoked for each [`AuditEvent`]. Typically backed by the
/// trace sink's `emit` (`llm_prompt_sent` / `llm_response_received`).
pub type AuditCallback = Arc<dyn Fn(AuditEvent) + Send + Sync>;

/// An audit callback that does nothing - useful for tests and for the
/// `finalize` node's summary call when no trace context is available.
pub fn noop_audit_callback() -> AuditCallback {
    Arc::new(|_event| {})
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::PromptSent { provider, model, .. } => {
                write!(f, "prompt_sent(provider={}, model={})", provider, model)
            }
            AuditEvent::ResponseReceived {
                provider,
                model,
                error,
                ..
            } => write!(
                f,
                "response_received(provider={}, model={}, error={:?})",
                provider, model, error
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn noop_callback_accepts_any_event_without_panicking() {
        let cb = noop_audit_callback();
        cb(AuditEvent::PromptSent {
            provider: "deepseek".to_string(),
            model: "deepseek-reasoner".to_string(),
            system_prompt: None,
            user_payload: serde_json::json!({}),
        });
    }

    #[test]
    fn callback_can_count_invocations() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let cb: AuditCallback = Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cb(AuditEvent::PromptSent {
            provider: "qwen".to_string(),
            model: "qwen-max".to_string(),
            system_prompt: None,
            user_payload: serde_json::json!({}),
        });
        cb(AuditEvent::ResponseReceived {
            provider: "qwen".to_string(),
            model: "qwen-max".to_string(),
            content: Some("ok".to_string()),
            error: None,
            fallback_used: false,
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
