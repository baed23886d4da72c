//! Registry - tools an agent may call
//!
//! An agent binds at most one tool, but the registry keeps the lookup and
//! the function-calling definitions in one place so the runner stays
//! tool-agnostic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Name, description and argument schema of a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name the model calls
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    /// Definition taking an empty arguments object
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Set the arguments schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Function-calling form offered to the model
    #[must_use]
    pub fn to_llm_tool(&self) -> council_llm::ToolDefinition {
        council_llm::ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }
}

/// Outcome of one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the call succeeded
    pub success: bool,
    /// Output on success, `null` otherwise
    pub output: Value,
    /// Error text on failure
    pub error: Option<String>,
    /// Wall-clock time spent
    pub duration_ms: u64,
}

impl ToolResult {
    /// Successful result
    #[must_use]
    pub fn success(output: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Text echoed into the conversation: pretty JSON output on success,
    /// `{"error": "..."}` on failure.
    #[must_use]
    pub fn to_text(&self) -> String {
        if self.success {
            serde_json::to_string_pretty(&self.output).unwrap_or_else(|_| self.output.to_string())
        } else {
            serde_json::json!({"error": self.error.as_deref().unwrap_or("unknown error")})
                .to_string()
        }
    }
}

/// A callable tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Static definition
    fn definition(&self) -> &ToolDefinition;

    /// Run with validated arguments. `Err` is reported to the model as a
    /// failed result.
    async fn execute(&self, input: Value) -> Result<ToolResult>;

    /// Reject arguments before execution. Defaults to requiring an object.
    fn validate_input(&self, input: &Value) -> Result<()> {
        if input.is_object() {
            Ok(())
        } else {
            Err(Error::InvalidInput("arguments must be a JSON object".to_string()))
        }
    }
}

/// Tools by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing one of the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Look a tool up
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions offered to the model, ordered by name
    #[must_use]
    pub fn to_llm_tools(&self) -> Vec<council_llm::ToolDefinition> {
        self.tools
            .values()
            .map(|tool| tool.definition().to_llm_tool())
            .collect()
    }
}
