//! The two LLM invocation primitives the reasoning engine calls through.

use crate::audit::{AuditCallback, AuditEvent};
use crate::json_extract::extract_json_object;
use crate::providers::{ChatMessage, OpenAiCompatibleClient};
use reasoning_core::{LlmError, ReasoningError, ReasoningResult};

/// Routing details for one LLM invocation: which client to use, and the
/// identifiers echoed into audit events and `llm_route` metadata.
pub struct LlmInvocation<'a> {
    pub client: &'a OpenAiCompatibleClient,
    pub provider: &'a str,
    pub model: &'a str,
}

/// Build a typed chat request, parse the reply as strict JSON, and audit
/// both ends of the call.
///
/// Parsing tries, in order: direct decode, a fenced ```json block, and the
/// outermost `{...}` slice. If none yield a JSON object the call fails with
/// [`LlmError::InvalidResponse`].
pub async fn invoke_json(
    invocation: &LlmInvocation<'_>,
    system_prompt: &str,
    user_payload: &serde_json::Value,
    schema_hint: &serde_json::Value,
    audit_cb: &AuditCallback,
) -> ReasoningResult<serde_json::Value> {
    audit_cb(AuditEvent::PromptSent {
        provider: invocation.provider.to_string(),
        model: invocation.model.to_string(),
        system_prompt: Some(system_prompt.to_string()),
        user_payload: user_payload.clone(),
    });

    let user_content = serde_json::json!({
        "input": user_payload,
        "schema_hint": schema_hint,
    })
    .to_string();

    let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_content)];

    let result = invocation
        .client
        .chat_completion(invocation.model, &messages)
        .await;

    let outcome = match &result {
        Ok(raw) => extract_json_object(raw).ok_or_else(|| {
            ReasoningError::Llm(LlmError::InvalidResponse {
                provider: invocation.provider.to_string(),
                reason: "response did not contain a parseable JSON object".to_string(),
            })
        }),
        Err(e) => Err(e.clone()),
    };

    if let Err(e) = &outcome {
        tracing::warn!(provider = %invocation.provider, model = %invocation.model, error = %e, "invoke_json failed");
    }

    audit_cb(AuditEvent::ResponseReceived {
        provider: invocation.provider.to_string(),
        model: invocation.model.to_string(),
        content: result.ok(),
        error: outcome.as_ref().err().map(|e| e.to_string()),
        fallback_used: false,
    });

    outcome
}

/// Produce a short natural-language summary; used only at `finalize`.
/// A failure here fails the run (the summary is not optional).
pub async fn summarize_with_context(
    invocation: &LlmInvocation<'_>,
    query: &str,
    ontology: &serde_json::Value,
    selected_task: &serde_json::Value,
    audit_cb: &AuditCallback,
) -> ReasoningResult<String> {
    const SYSTEM_PROMPT: &str =
        "Summarize the outcome of this reasoning run in 2-3 plain sentences for the end user.";

    let user_payload = serde_json::json!({
        "query": query,
        "ontology": ontology,
        "selected_task": selected_task,
    });

    audit_cb(AuditEvent::PromptSent {
        provider: invocation.provider.to_string(),
        model: invocation.model.to_string(),
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        user_payload: user_payload.clone(),
    });

    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_payload.to_string()),
    ];

    let result = invocation
        .client
        .chat_completion(invocation.model, &messages)
        .await
        .map_err(|e| ReasoningError::Llm(LlmError::SummarizationFailed {
            reason: e.to_string(),
        }));

    if let Err(e) = &result {
        tracing::warn!(provider = %invocation.provider, model = %invocation.model, error = %e, "summarize_with_context failed");
    }

    audit_cb(AuditEvent::ResponseReceived {
        provider: invocation.provider.to_string(),
        model: invocation.model.to_string(),
        content: result.as_ref().ok().cloned(),
        error: result.as_ref().err().map(|e| e.to_string()),
        fallback_used: false,
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::noop_audit_callback;

    #[tokio::test]
    async fn invoke_json_surfaces_llm_error_without_panicking() {
        let client = OpenAiCompatibleClient::new(
            "deepseek",
            "http://127.0.0.1:1",
            "sk-test",
            50,
        )
        .expect("client should build");
        let invocation = LlmInvocation {
            client: &client,
            provider: "deepseek",
            model: "deepseek-reasoner",
        };
        let audit_cb = noop_audit_callback();

        let result = invoke_json(
            &invocation,
            "system prompt",
            &serde_json::json!({"query": "test"}),
            &serde_json::json!({"keywords": "array"}),
            &audit_cb,
        )
        .await;

        assert!(result.is_err());
    }
}
