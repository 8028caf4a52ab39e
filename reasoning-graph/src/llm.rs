//! Thin routing wrapper over `reasoning-llm`'s two invocation primitives,
//! adding typed-JSON deserialization at the node boundary.

use crate::types::DataPlan;
use reasoning_core::{LlmError, ReasoningError, ReasoningResult};
use reasoning_llm::{invoke_json, summarize_with_context, AuditCallback, LlmInvocation, OpenAiCompatibleClient};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Which client/provider/model an invocation should route through.
pub struct LlmRouting<'a> {
    pub client: &'a OpenAiCompatibleClient,
    pub provider: &'a str,
    pub model: &'a str,
}

impl<'a> LlmRouting<'a> {
    fn invocation(&self) -> LlmInvocation<'_> {
        LlmInvocation {
            client: self.client,
            provider: self.provider,
            model: self.model,
        }
    }
}

/// `invoke_json` plus a typed decode of the resulting object. Any failure
/// at this node boundary - transport, provider, or schema mismatch - is
/// reported as `LlmError::DecisionFailed` tagged with `task` (§8 scenario
/// 4), the same wrapping the original applies around its own `_invoke_json`
/// helper.
pub async fn invoke_typed_json<T: DeserializeOwned>(
    routing: &LlmRouting<'_>,
    task: &str,
    system_prompt: &str,
    user_payload: &Value,
    schema_hint: &Value,
    audit_cb: &AuditCallback,
) -> ReasoningResult<T> {
    let invocation = routing.invocation();
    let value = invoke_json(&invocation, system_prompt, user_payload, schema_hint, audit_cb)
        .await
        .map_err(|e| {
            ReasoningError::Llm(LlmError::DecisionFailed {
                task: task.to_string(),
                reason: e.to_string(),
            })
        })?;
    serde_json::from_value(value).map_err(|e| {
        ReasoningError::Llm(LlmError::DecisionFailed {
            task: task.to_string(),
            reason: format!("schema mismatch: {e}"),
        })
    })
}

/// The executors' shared plan-typed invocation.
pub async fn invoke_plan_json(
    routing: &LlmRouting<'_>,
    task: &str,
    system_prompt: &str,
    user_payload: &Value,
    schema_hint: &Value,
    audit_cb: &AuditCallback,
) -> ReasoningResult<DataPlan> {
    invoke_typed_json(routing, task, system_prompt, user_payload, schema_hint, audit_cb).await
}

/// `finalize`'s plain-text summary call.
pub async fn summarize(
    routing: &LlmRouting<'_>,
    query: &str,
    ontology: &Value,
    selected_task: &Value,
    audit_cb: &AuditCallback,
) -> ReasoningResult<String> {
    let invocation = routing.invocation();
    summarize_with_context(&invocation, query, ontology, selected_task, audit_cb).await
}
