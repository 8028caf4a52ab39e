//! OpenAI-compatible chat-completions client.
//!
//! Covers any provider that speaks the `POST /chat/completions` dialect:
//! Deepseek and Qwen out of the box, plus a tenant-supplied `base_url`
//! override for a generic provider.

pub mod client;

pub use client::{ChatMessage, OpenAiCompatibleClient};
