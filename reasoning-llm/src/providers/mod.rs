//! LLM provider implementations.

pub mod openai_compatible;

pub use openai_compatible::{ChatMessage, OpenAiCompatibleClient};
