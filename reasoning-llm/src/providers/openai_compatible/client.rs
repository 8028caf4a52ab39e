//! Minimal OpenAI-compatible chat-completions HTTP client.

use reasoning_core::{LlmError, ReasoningError, ReasoningResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single chat message in the OpenAI chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// A thin HTTP client against one OpenAI-compatible endpoint.
pub struct OpenAiCompatibleClient {
    client: Client,
    provider: String,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    /// Build a client with a connect/read timeout; the timeout is the only
    /// enforcement mechanism for slow or hung providers (no retries here -
    /// retry is a higher-level concern).
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> ReasoningResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
            .build()
            .map_err(|e| {
                ReasoningError::Llm(LlmError::RequestFailed {
                    provider: "http-client".to_string(),
                    status: 0,
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Issue one chat-completions call, returning the first choice's raw
    /// text content.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> ReasoningResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: 0.0,
        };
        tracing::debug!(provider = %self.provider, %model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ReasoningError::Llm(LlmError::RequestFailed {
                    provider: self.provider.clone(),
                    status: 0,
                    message: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            tracing::warn!(
                provider = %self.provider,
                status = status.as_u16(),
                "chat completion request failed"
            );
            return Err(ReasoningError::Llm(LlmError::RequestFailed {
                provider: self.provider.clone(),
                status: status.as_u16() as i32,
                message,
            }));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            ReasoningError::Llm(LlmError::InvalidResponse {
                provider: self.provider.clone(),
                reason: e.to_string(),
            })
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ReasoningError::Llm(LlmError::InvalidResponse {
                    provider: self.provider.clone(),
                    reason: "response contained no choices".to_string(),
                })
            })
    }
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors_set_role() {
        let system = ChatMessage::system("be terse");
        assert_eq!(system.role, "system");
        let user = ChatMessage::user("hello");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn client_debug_redacts_api_key() {
        let client = OpenAiCompatibleClient::new(
            "deepseek",
            "https://api.deepseek.com/v1",
            "sk-test",
            5_000,
        )
        .expect("client should build");
        let debug = format!("{:?}", client);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("sk-test"));
    }
}
