//! reasoning-llm - the LLM Client
//!
//! Two primitives the reasoning engine calls through: `invoke_json` (typed
//! chat -> strict JSON) and `summarize_with_context` (typed chat -> plain
//! text, used only at `finalize`). Both audit every call via a callback.

mod audit;
mod invoke;
mod json_extract;
mod providers;

pub use audit::{noop_audit_callback, AuditCallback, AuditEvent};
pub use invoke::{invoke_json, summarize_with_context, LlmInvocation};
pub use json_extract::extract_json_object;
pub use providers::{ChatMessage, OpenAiCompatibleClient};
