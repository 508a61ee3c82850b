//! Tool trait, registry, and executor.
//!
//! Tools are registered once at startup and advertised to the LLM as a
//! capability manifest. Execution failures are never fatal: unknown tools,
//! invalid arguments, and handler errors are all downgraded to textual tool
//! results so the model can recover or explain.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::{ChatMessage, ToolCall};

mod calculator;
mod notes;
mod time;
mod word_count;

pub use calculator::Calculator;
pub use notes::SearchNotes;
pub use time::CurrentTime;
pub use word_count::WordCounter;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("A tool named '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

/// A capability the agent can invoke on the model's behalf.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description, shown to the model.
    fn description(&self) -> &str;

    /// Argument schema (JSON Schema format).
    fn parameters_schema(&self) -> Value;

    /// Validate arguments before execution. The default checks the
    /// schema's `required` list.
    fn validate_args(&self, args: &Value) -> Result<(), ToolError> {
        let schema = self.parameters_schema();
        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for field in required {
                if let Some(field_name) = field.as_str() {
                    if args.get(field_name).is_none() {
                        return Err(ToolError::InvalidArgs(format!(
                            "missing required field: {}",
                            field_name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Registry of available tools, immutable after startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Name collisions are a startup configuration error.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Names and descriptions of all registered tools.
    pub fn list_tools(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// The capability manifest advertised to the model, in OpenAI
    /// function-calling format.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters_schema(),
                    }
                })
            })
            .collect()
    }

    /// Execute a requested tool call, producing the tool-result message.
    ///
    /// Never fails: unknown tools, bad arguments, and handler errors all
    /// come back as result text correlated to the call id.
    pub async fn dispatch(&self, call: &ToolCall) -> ChatMessage {
        let name = &call.function.name;
        let text = match self.get(name) {
            None => {
                tracing::warn!(tool = %name, "model requested an unregistered tool");
                format!("Unknown tool: {}", name)
            }
            Some(tool) => {
                let args: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
                match tool.validate_args(&args) {
                    Err(e) => e.to_string(),
                    Ok(()) => match tool.execute(args).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!(tool = %name, error = %e, "tool execution failed");
                            format!("Error: {}", e)
                        }
                    },
                }
            }
        };
        ChatMessage::tool_result(&call.id, text)
    }
}

/// Build the registry with the standard tool set.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CurrentTime))?;
    registry.register(Box::new(Calculator))?;
    registry.register(Box::new(SearchNotes))?;
    registry.register(Box::new(WordCounter))?;
    Ok(registry)
}
