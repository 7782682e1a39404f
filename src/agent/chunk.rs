//! Streamed agent output chunks
//!
//! One turn produces a lazy, ordered, finite sequence of chunks. Only
//! `Text` chunks contribute to the assistant's reply; every other kind is
//! reported to the log and skipped by the transcript.

use serde_json::Value;

/// One incremental unit of an agent's streamed output, tagged by kind.
#[derive(Debug, Clone)]
pub enum AgentChunk {
    /// A piece of the assistant's reply text.
    Text(String),

    /// The agent decided to invoke a tool.
    ToolUse { name: String, arguments: Value },

    /// Output of an executed tool, already fed back to the LLM.
    ToolResult { name: String, output: String },
}

impl AgentChunk {
    /// Kind tag for logging and reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentChunk::Text(_) => "text",
            AgentChunk::ToolUse { .. } => "tool_use",
            AgentChunk::ToolResult { .. } => "tool_result",
        }
    }

    /// The reply text, if this is a text chunk.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AgentChunk::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tags() {
        assert_eq!(AgentChunk::Text("hi".into()).kind(), "text");
        assert_eq!(
            AgentChunk::ToolUse {
                name: "search".into(),
                arguments: json!({})
            }
            .kind(),
            "tool_use"
        );
        assert_eq!(
            AgentChunk::ToolResult {
                name: "search".into(),
                output: "...".into()
            }
            .kind(),
            "tool_result"
        );
    }

    #[test]
    fn test_as_text() {
        assert_eq!(AgentChunk::Text("hi".into()).as_text(), Some("hi"));
        assert!(AgentChunk::ToolResult {
            name: "search".into(),
            output: "x".into()
        }
        .as_text()
        .is_none());
    }
}
