//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`ProviderRegistry`] for creating clients from configuration
//! - Concrete implementations: Anthropic Messages API, OpenAI-compatible
//!   Chat Completions (also serving Groq via a base-URL override)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, Provider};
use crate::tools::ToolDefinition;
use crate::Result;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Check if response has tool calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait — swappable provider abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get a response.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse>;

    /// The model this client talks to.
    fn model(&self) -> &str;
}

/// Provider registry — creates LLM clients from configuration.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create an LLM client for the configured provider.
    pub fn create(config: &Config) -> Result<Box<dyn LlmClient>> {
        let client: Box<dyn LlmClient> = match config.provider {
            Provider::Anthropic => Box::new(AnthropicClient::new(
                &config.llm_api_key,
                &config.model,
                config.temperature,
            )),
            Provider::OpenAi => Box::new(OpenAiClient::new(
                &config.llm_api_key,
                &config.model,
                config.temperature,
            )),
            // Groq speaks the Chat Completions protocol.
            Provider::Groq => Box::new(OpenAiClient::with_base_url(
                openai::GROQ_API_URL,
                &config.llm_api_key,
                &config.model,
                config.temperature,
            )),
        };
        Ok(client)
    }
}

/// Fake LLM client for testing.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<LlmResponse>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: std::sync::Mutex::new(
                responses.iter().map(|s| Ok(LlmResponse::text(*s))).collect(),
            ),
        }
    }

    /// Create with a single tool call followed by a text response.
    pub fn with_tool_call(name: &str, args: serde_json::Value, final_response: &str) -> Self {
        let tool_response = LlmResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "tc_1".to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        };

        Self {
            responses: std::sync::Mutex::new(
                vec![Ok(tool_response), Ok(LlmResponse::text(final_response))].into(),
            ),
        }
    }

    /// Create with an explicit response script, errors included.
    pub fn scripted(responses: Vec<Result<LlmResponse>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> Result<LlmResponse> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .unwrap_or_else(|| Err(crate::error::Error::Llm("No more fake responses".to_string())))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_llm_client() {
        let client = FakeLlmClient::new(vec!["Hello!", "World!"]);

        let resp1 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp1.content.as_deref(), Some("Hello!"));

        let resp2 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp2.content.as_deref(), Some("World!"));

        assert!(client.chat(&[], &[]).await.is_err());
    }
}
