//! Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{LlmClient, LlmResponse, Usage};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: usize = 4096;

/// Anthropic API response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

/// A single content block in a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            client: Client::new(),
        }
    }

    /// Convert provider-neutral messages to Anthropic turns.
    ///
    /// The system message travels in the top-level `system` field; tool
    /// results become `tool_result` blocks inside a user turn.
    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| match m.role {
                Role::Tool => json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.as_deref().unwrap_or("unknown"),
                        "content": m.content,
                    }]
                }),
                Role::Assistant if m.tool_calls.is_some() => {
                    let mut blocks = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(json!({"type": "text", "text": m.content}));
                    }
                    for tc in m.tool_calls.as_deref().unwrap_or_default() {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.name,
                            "input": tc.arguments,
                        }));
                    }
                    json!({"role": "assistant", "content": blocks})
                }
                Role::Assistant => json!({"role": "assistant", "content": m.content}),
                _ => json!({"role": "user", "content": m.content}),
            })
            .collect()
    }

    fn system_prompt(&self, messages: &[Message]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        Some(
            tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect(),
        )
    }

    fn parse_response(&self, response: AnthropicResponse) -> LlmResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    });
                }
                ContentBlock::Unknown => {
                    tracing::warn!("Skipping unknown content block kind");
                }
            }
        }

        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
            finish_reason: response.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse> {
        let mut request = json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "temperature": self.temperature,
            "messages": self.convert_messages(messages),
        });

        if let Some(system) = self.system_prompt(messages) {
            request["system"] = json!(system);
        }

        if let Some(tools) = self.convert_tools(tools) {
            request["tools"] = tools;
        }

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::Llm(format!("Anthropic API error: {error_text}")));
        }

        let parsed: AnthropicResponse = response.json().await?;
        Ok(self.parse_response(parsed))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new("key", "claude-3-sonnet-20240229", 0.7)
    }

    #[test]
    fn test_parse_text_response() {
        let raw: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [{"type": "text", "text": "Hello there"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 4}
            }"#,
        )
        .unwrap();

        let response = client().parse_response(raw);
        assert_eq!(response.content.as_deref(), Some("Hello there"));
        assert!(!response.has_tool_calls());
        assert_eq!(response.usage.total_tokens, 16);
    }

    #[test]
    fn test_parse_tool_use_response() {
        let raw: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Let me look that up."},
                    {"type": "tool_use", "id": "tu_1", "name": "search", "input": {"query": "weather"}}
                ],
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let response = client().parse_response(raw);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "search");
        assert_eq!(response.finish_reason, "tool_use");
    }

    #[test]
    fn test_unknown_block_kind_is_skipped() {
        let raw: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "Answer"}
                ],
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let response = client().parse_response(raw);
        assert_eq!(response.content.as_deref(), Some("Answer"));
    }

    #[test]
    fn test_convert_tool_result_message() {
        let converted =
            client().convert_messages(&[Message::tool_result("tu_1", "sunny, 21C")]);

        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0]["role"], "user");
        assert_eq!(converted[0]["content"][0]["type"], "tool_result");
        assert_eq!(converted[0]["content"][0]["tool_use_id"], "tu_1");
    }

    #[test]
    fn test_system_message_lifted_out() {
        let messages = [Message::system("persona"), Message::user("hi")];
        let converted = client().convert_messages(&messages);

        assert_eq!(converted.len(), 1);
        assert_eq!(client().system_prompt(&messages).as_deref(), Some("persona"));
    }
}
