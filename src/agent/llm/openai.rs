//! OpenAI-compatible Chat Completions client.
//!
//! Also serves Groq, whose API speaks the same protocol at a different
//! base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{LlmClient, LlmResponse, Usage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Chat Completions response.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: String,
    function: RawFunction,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

/// OpenAI-compatible Chat Completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Self {
        Self::with_base_url(OPENAI_API_URL, api_key, model, temperature)
    }

    /// Client against a protocol-compatible endpoint (e.g. Groq).
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str, temperature: f32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            client: Client::new(),
        }
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => json!({"role": "system", "content": m.content}),
                Role::User => json!({"role": "user", "content": m.content}),
                Role::Tool => json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id.as_deref().unwrap_or("unknown"),
                    "content": m.content,
                }),
                Role::Assistant => {
                    if let Some(tool_calls) = &m.tool_calls {
                        let calls: Vec<Value> = tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments.to_string(),
                                    }
                                })
                            })
                            .collect();
                        json!({"role": "assistant", "content": m.content, "tool_calls": calls})
                    } else {
                        json!({"role": "assistant", "content": m.content})
                    }
                }
            })
            .collect()
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
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        )
    }

    fn parse_response(&self, response: CompletionResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No choices in response".to_string()))?;

        let mut tool_calls = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            let arguments: Value = serde_json::from_str(&call.function.arguments)
                .map_err(|e| Error::Llm(format!("Malformed tool arguments: {e}")))?;
            tool_calls.push(ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }

        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse> {
        let mut request = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": self.convert_messages(messages),
        });

        if let Some(tools) = self.convert_tools(tools) {
            request["tools"] = tools;
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::Llm(format!("Chat Completions error: {error_text}")));
        }

        let parsed: CompletionResponse = response.json().await?;
        self.parse_response(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("key", "gpt-4", 0.7)
    }

    #[test]
    fn test_parse_text_response() {
        let raw: CompletionResponse = serde_json::from_str(
            r#"{
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
            }"#,
        )
        .unwrap();

        let response = client().parse_response(raw).unwrap();
        assert_eq!(response.content.as_deref(), Some("Hello!"));
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[test]
    fn test_parse_tool_call_arguments() {
        let raw: CompletionResponse = serde_json::from_str(
            r#"{
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "search", "arguments": "{\"query\": \"rust\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            }"#,
        )
        .unwrap();

        let response = client().parse_response(raw).unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments["query"], "rust");
    }

    #[test]
    fn test_empty_choices_is_error() {
        let raw: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(client().parse_response(raw).is_err());
    }

    #[test]
    fn test_groq_base_url() {
        let groq = OpenAiClient::with_base_url(GROQ_API_URL, "key", "llama3-70b-8192", 0.7);
        assert_eq!(groq.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(groq.model(), "llama3-70b-8192");
    }

    #[test]
    fn test_assistant_tool_calls_roundtrip_shape() {
        let msg = Message::assistant_with_tools(
            "",
            vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "search".to_string(),
                arguments: json!({"query": "rust"}),
            }],
        );
        let converted = client().convert_messages(&[msg]);

        assert_eq!(converted[0]["role"], "assistant");
        assert_eq!(converted[0]["tool_calls"][0]["function"]["name"], "search");
        // Arguments are JSON-encoded strings on the wire.
        assert!(converted[0]["tool_calls"][0]["function"]["arguments"].is_string());
    }
}
