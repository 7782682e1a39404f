//! Tool runner - manages and executes tools

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::Result;

use super::exa::{ExaClient, FindSimilarTool, GetContentsTool, SearchTool};
use super::Tool;

/// Tool definition for the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a tool runner with the web tool set.
    pub fn with_web_tools(exa_api_key: &str) -> Self {
        let mut runner = Self::new();
        let exa = ExaClient::new(exa_api_key);

        runner.register(SearchTool::new(exa.clone()));
        runner.register(FindSimilarTool::new(exa.clone()));
        runner.register(GetContentsTool::new(exa));

        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get tool definitions for the LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {name}")))?;

        tool.execute(params).await
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}
