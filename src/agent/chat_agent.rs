//! Chat agent — the step loop over LLM and tools.
//!
//! One turn is exposed as a lazy stream of [`AgentChunk`]s: each step
//! calls the LLM, yields its text, executes any requested tool calls and
//! feeds the results back, until a step requests no tools.

use std::pin::Pin;

use async_stream::try_stream;
use futures_util::Stream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Profile;
use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolRunner;
use crate::Result;

use super::chunk::AgentChunk;
use super::llm::{LlmClient, ProviderRegistry};
use super::message::{Message, ToolCallRequest};
use super::persona;

/// Boxed chunk stream for one turn.
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<AgentChunk>> + Send + 'a>>;

/// A conversational agent producing tagged output chunks per turn.
///
/// Object-safe so orchestration can be tested with a scripted fake.
pub trait Agent: Send + Sync {
    /// Run one turn against the prior history and the new input.
    ///
    /// The `thread_id` is the session correlation key; chunks arrive in
    /// order and the stream is finite.
    fn stream<'a>(
        &'a self,
        history: &'a [Message],
        input: &'a str,
        thread_id: Uuid,
    ) -> ChunkStream<'a>;
}

/// Build a tool-augmented agent bound to the assistant persona,
/// optionally personalized with the signed-in profile.
pub fn build_agent(config: &Config, profile: Option<&Profile>) -> Result<ChatAgent> {
    let client = ProviderRegistry::create(config)?;
    let tools = ToolRunner::with_web_tools(&config.exa_api_key);

    Ok(ChatAgent::new(
        client,
        tools,
        persona::system_prompt(profile),
        config.max_steps,
    ))
}

/// The production agent: boxed LLM client plus the web tool set.
pub struct ChatAgent {
    client: Box<dyn LlmClient>,
    tools: ToolRunner,
    system_prompt: String,
    max_steps: usize,
}

impl ChatAgent {
    pub fn new(
        client: Box<dyn LlmClient>,
        tools: ToolRunner,
        system_prompt: String,
        max_steps: usize,
    ) -> Self {
        Self {
            client,
            tools,
            system_prompt,
            max_steps,
        }
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> String {
        debug!("Executing tool: {} with args: {}", call.name, call.arguments);

        match self.tools.execute(&call.name, call.arguments.clone()).await {
            Ok(result) => result,
            // Tool failures go back to the model as output, they don't
            // end the turn.
            Err(e) => format!("Error: {e}"),
        }
    }
}

impl Agent for ChatAgent {
    fn stream<'a>(
        &'a self,
        history: &'a [Message],
        input: &'a str,
        thread_id: Uuid,
    ) -> ChunkStream<'a> {
        Box::pin(try_stream! {
            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(Message::system(self.system_prompt.clone()));
            messages.extend(history.iter().cloned());
            messages.push(Message::user(input));

            let tools = self.tools.definitions();
            info!(%thread_id, "Starting agent turn");

            let mut completed = false;
            for step in 0..self.max_steps {
                debug!("Step {}/{}", step + 1, self.max_steps);

                let response = self.client.chat(&messages, &tools).await?;

                if let Some(text) = response.content.clone().filter(|t| !t.is_empty()) {
                    yield AgentChunk::Text(text);
                }

                if !response.has_tool_calls() {
                    info!(%thread_id, "Agent turn complete after {} step(s)", step + 1);
                    completed = true;
                    break;
                }

                messages.push(Message::assistant_with_tools(
                    response.content.clone().unwrap_or_default(),
                    response.tool_calls.clone(),
                ));

                for call in &response.tool_calls {
                    yield AgentChunk::ToolUse {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    };

                    let output = self.run_tool(call).await;
                    messages.push(Message::tool_result(&call.id, &output));

                    yield AgentChunk::ToolResult {
                        name: call.name.clone(),
                        output,
                    };
                }
            }

            if !completed {
                Err(Error::MaxSteps)?;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::tools::DummyTool;
    use futures_util::TryStreamExt;
    use serde_json::json;

    fn agent(client: FakeLlmClient) -> ChatAgent {
        ChatAgent::new(
            Box::new(client),
            ToolRunner::new(),
            "You are a test assistant.".to_string(),
            10,
        )
    }

    #[tokio::test]
    async fn test_simple_text_turn() {
        let agent = agent(FakeLlmClient::new(vec!["Hello, human!"]));

        let chunks: Vec<AgentChunk> = agent
            .stream(&[], "Hi there", Uuid::new_v4())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_text(), Some("Hello, human!"));
    }

    #[tokio::test]
    async fn test_tool_call_turn_yields_tagged_chunks() {
        let mut tools = ToolRunner::new();
        tools.register(DummyTool {
            name: "search".to_string(),
            result: "search output".to_string(),
        });

        let client = FakeLlmClient::with_tool_call(
            "search",
            json!({"query": "weather"}),
            "It's sunny.",
        );
        let agent = ChatAgent::new(Box::new(client), tools, String::new(), 10);

        let chunks: Vec<AgentChunk> = agent
            .stream(&[], "What's the weather?", Uuid::new_v4())
            .try_collect()
            .await
            .unwrap();

        let kinds: Vec<&str> = chunks.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["tool_use", "tool_result", "text"]);
        assert_eq!(chunks[2].as_text(), Some("It's sunny."));
    }

    #[tokio::test]
    async fn test_unknown_tool_feeds_error_back() {
        // No tools registered, but the model asks for one.
        let client = FakeLlmClient::with_tool_call("missing", json!({}), "Recovered.");
        let agent = agent(client);

        let chunks: Vec<AgentChunk> = agent
            .stream(&[], "go", Uuid::new_v4())
            .try_collect()
            .await
            .unwrap();

        match &chunks[1] {
            AgentChunk::ToolResult { output, .. } => assert!(output.contains("Error")),
            other => panic!("expected tool_result, got {}", other.kind()),
        }
        assert_eq!(chunks[2].as_text(), Some("Recovered."));
    }

    #[tokio::test]
    async fn test_step_limit() {
        use crate::agent::llm::{LlmResponse, Usage};

        // Every response requests another tool call, forever.
        let looping = |_: usize| LlmResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "tc".to_string(),
                name: "spin".to_string(),
                arguments: json!({}),
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        };
        let client = FakeLlmClient::scripted((0..5).map(|i| Ok(looping(i))).collect());

        let agent = ChatAgent::new(Box::new(client), ToolRunner::new(), String::new(), 3);
        let result: Result<Vec<AgentChunk>> = agent
            .stream(&[], "go", Uuid::new_v4())
            .try_collect()
            .await;

        assert!(matches!(result, Err(Error::MaxSteps)));
    }

    #[tokio::test]
    async fn test_llm_error_surfaces() {
        let client = FakeLlmClient::scripted(vec![Err(Error::Llm("boom".to_string()))]);
        let agent = agent(client);

        let result: Result<Vec<AgentChunk>> = agent
            .stream(&[], "go", Uuid::new_v4())
            .try_collect()
            .await;

        assert!(matches!(result, Err(Error::Llm(_))));
    }
}
