//! Tool system available to the LLM agent
//!
//! Tools are registered from the `[tools]` config section, describe their
//! parameters with a JSON schema, and have every call validated against that
//! schema before it runs.

use crate::config::ToolConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub mod builtin;

/// A capability the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema of the parameters
    fn describe(&self) -> ToolDescription;

    /// Apply the optional `config` table from the tool's config entry.
    /// Called once before the tool is registered.
    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError>;

    /// Run the tool. `parameters` already passed schema validation.
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool metadata sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of initialized tools
pub struct ToolSystem {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Build and initialize every tool named in the config
    pub async fn initialize(
        &mut self,
        tool_configs: &HashMap<String, ToolConfig>,
    ) -> Result<(), ToolError> {
        for (tool_name, tool_config) in tool_configs {
            let (implementation, config) = match tool_config {
                ToolConfig::Simple(implementation) => (implementation, None),
                ToolConfig::Complex {
                    implementation,
                    config,
                } => {
                    let value = serde_json::to_value(config)
                        .map_err(|e| ToolError::InitializationError(e.to_string()))?;
                    (implementation, Some(value))
                }
            };

            let mut tool = match implementation.as_str() {
                "builtin" => builtin::create(tool_name)?,
                other => return Err(ToolError::UnknownImplementation(other.to_string())),
            };
            tool.initialize(config.as_ref()).await?;

            debug!(tool = %tool_name, implementation = %implementation, "Tool initialized");
            self.tools.insert(tool_name.clone(), tool);
        }

        info!(count = self.tools.len(), "Tool system ready");
        Ok(())
    }

    /// Register an already initialized tool under its described name
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.describe().name;
        self.tools.insert(name, tool);
    }

    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of all registered tools, sorted by name
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> =
            self.tools.values().map(|tool| tool.describe()).collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    /// Validate `parameters` against the tool's schema and run it
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        validate_parameters(&tool.describe().parameters, parameters)?;
        tool.execute(parameters).await
    }

    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_parameters(schema: &Value, parameters: &Value) -> Result<(), ToolError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

    validator.validate(parameters).map_err(|errors| {
        let messages: Vec<String> = errors
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect();
        ToolError::ValidationError(messages.join("; "))
    })
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unknown tool implementation: {0}")]
    UnknownImplementation(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}
