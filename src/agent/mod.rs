//! Agent module — the tool-augmented conversational agent.
//!
//! This module contains:
//! - LLM-layer message types
//! - LLM client trait and provider implementations
//! - The assistant persona (system prompt + personalization)
//! - The chat agent: a step loop over LLM and tools, exposed as a lazy
//!   stream of tagged output chunks per turn

mod chat_agent;
mod chunk;
mod message;
pub mod persona;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use chat_agent::{build_agent, Agent, ChatAgent, ChunkStream};
pub use chunk::AgentChunk;
pub use llm::{AnthropicClient, LlmClient, LlmResponse, OpenAiClient, ProviderRegistry, Usage};
pub use message::{Message, Role, ToolCallRequest};
