//! Configuration system for the A2A task server
//!
//! Configuration is a TOML file with `[server]`, `[agent]`, `[llm]`,
//! `[tools]` and `[tasks]` sections. Secrets never live in the file: the LLM
//! API key is read at runtime from the environment variable named by
//! `llm.api_key_env`.

use crate::protocol::agent_card::{AgentCapabilities, AgentCard, AgentSkill};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub agent: AgentSection,
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
    #[serde(default)]
    pub tasks: TaskSection,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL advertised in the agent card; defaults to `http://{host}:{port}/`
    pub public_url: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    10002
}

/// Agent identity, published through the agent card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    pub name: String,
    pub description: String,
    #[serde(default = "default_agent_version")]
    pub version: String,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

fn default_agent_version() -> String {
    "1.0.0".to_string()
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name (currently "openai")
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// System prompt
    pub system_prompt: String,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens
    pub max_tokens: Option<u32>,
    /// Override of the provider's API base URL
    pub base_url: Option<String>,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolConfig {
    /// Simple form: tool_name = "identifier"
    Simple(String),
    /// Complex form: tool_name = { impl = "identifier", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

/// Task execution limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSection {
    /// Upper bound on a single agent invocation
    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,
    /// Maximum LLM round trips while the model keeps requesting tools
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            invoke_timeout_secs: default_invoke_timeout_secs(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl TaskSection {
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }
}

fn default_invoke_timeout_secs() -> u64 {
    120
}

fn default_max_tool_iterations() -> usize {
    10
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "agent.name must not be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be non-zero".to_string(),
            ));
        }
        if let Some(public_url) = &self.server.public_url {
            Url::parse(public_url).map_err(|e| {
                ConfigError::InvalidConfig(format!("server.public_url '{public_url}': {e}"))
            })?;
        }
        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url).map_err(|e| {
                ConfigError::InvalidConfig(format!("llm.base_url '{base_url}': {e}"))
            })?;
        }
        if self.tasks.invoke_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "tasks.invoke_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.tasks.max_tool_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "tasks.max_tool_iterations must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    /// URL advertised to callers
    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}/", self.server.host, self.server.port))
    }

    /// Build the discovery document from the agent section
    pub fn agent_card(&self) -> AgentCard {
        AgentCard {
            name: self.agent.name.clone(),
            description: self.agent.description.clone(),
            url: self.public_url(),
            version: self.agent.version.clone(),
            capabilities: AgentCapabilities {
                streaming: self.agent.streaming,
                push_notifications: false,
                state_transition_history: false,
            },
            skills: self.agent.skills.clone(),
        }
    }
}

impl Default for AgentConfig {
    /// The stock time-telling agent, used when no config file is supplied
    fn default() -> Self {
        let mut tools = HashMap::new();
        tools.insert(
            "current_time".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );

        Self {
            server: ServerSection::default(),
            agent: AgentSection {
                name: "TellTimeAgent".to_string(),
                description: "This agent replies with the current system time.".to_string(),
                version: default_agent_version(),
                streaming: false,
                skills: vec![AgentSkill {
                    id: "tell_time".to_string(),
                    name: "Tell Time Tool".to_string(),
                    description: Some("Replies with the current time".to_string()),
                    tags: Some(vec!["time".to_string()]),
                    examples: Some(vec![
                        "What time is it?".to_string(),
                        "Tell me the current time".to_string(),
                    ]),
                    input_modes: None,
                    output_modes: None,
                }],
            },
            llm: LlmSection {
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                system_prompt: "You are a helpful assistant that tells the current time. \
                    Reply with the current time in the format YYYY-MM-DD HH:MM:SS when asked about time."
                    .to_string(),
                temperature: None,
                max_tokens: None,
                base_url: None,
            },
            tools,
            tasks: TaskSection::default(),
        }
    }
}
