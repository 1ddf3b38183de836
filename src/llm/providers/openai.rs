//! OpenAI chat-completions backend
//!
//! Talks to `{base_url}/chat/completions`. The base URL is configurable so
//! OpenAI-compatible gateways and test servers can stand in for the real API.

use crate::config::LlmSection;
use crate::llm::provider::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, FinishReason, LlmError,
    LlmProvider, TokenUsage, ToolCall,
};
use crate::tools::ToolDescription;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Delays before each retry of a transient failure
const RETRY_BACKOFF_MS: [u64; 3] = [100, 200, 300];

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    /// Build from the `[llm]` section and an already resolved API key
    pub fn from_section(section: &LlmSection, api_key: String) -> Self {
        Self {
            api_key,
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ..Default::default()
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn to_wire_message(message: &ChatMessage) -> WireMessage {
        let role = match message.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        WireMessage {
            role: role.to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
        }
    }

    fn to_wire_tool(tool: &ToolDescription) -> WireTool {
        WireTool {
            tool_type: "function".to_string(),
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn build_wire_request(request: &CompletionRequest) -> WireRequest {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(request.tools.iter().map(Self::to_wire_tool).collect())
        };

        WireRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::to_wire_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
        }
    }

    fn parse_response(response: WireResponse) -> Result<CompletionResponse, LlmError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from OpenAI".to_string())
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_deref()
            .map(Self::extract_tool_calls)
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            usage,
            finish_reason: Self::finish_reason(choice.finish_reason.as_deref()),
            tool_calls,
        })
    }

    fn extract_tool_calls(calls: &[WireToolCall]) -> Vec<ToolCall> {
        calls
            .iter()
            .filter_map(|call| {
                match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
                    Ok(arguments) => Some(ToolCall {
                        id: call.id.clone(),
                        name: call.function.name.clone(),
                        arguments,
                    }),
                    Err(e) => {
                        error!(tool = %call.function.name, "Failed to parse tool call arguments: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    fn finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }

    fn classify_status(status: StatusCode, body: &str) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("OpenAI API error: {status} - {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("OpenAI API error: {status} - {body}"))
            }
            s if s.is_server_error() => {
                LlmError::ApiError(format!("OpenAI API server error: {status} - {body}"))
            }
            _ => LlmError::ApiError(format!("OpenAI API error: {status} - {body}")),
        }
    }

    async fn send_once(&self, request: &WireRequest) -> Result<WireResponse, LlmError> {
        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                LlmError::NetworkError(format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    async fn send_with_retry(&self, request: &WireRequest) -> Result<WireResponse, LlmError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "OpenAI request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < RETRY_BACKOFF_MS.len() => {
                    let delay = RETRY_BACKOFF_MS[attempt];
                    warn!(attempt = attempt + 1, delay_ms = delay, "OpenAI request failed, retrying: {}", e);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts = attempt + 1, "OpenAI request failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn available_models(&self) -> Vec<String> {
        ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let wire_request = Self::build_wire_request(&request);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending OpenAI completion request"
        );

        let wire_response = self.send_with_retry(&wire_request).await?;
        let response = Self::parse_response(wire_response)?;

        debug!(
            total_tokens = response.usage.total_tokens,
            finish_reason = ?response.finish_reason,
            tool_calls = response.tool_calls.len(),
            "OpenAI completion received"
        );
        Ok(response)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify_status(status, &body))
        }
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_requires_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_default_model_is_known() {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: "k".to_string(),
            ..OpenAiConfig::default()
        })
        .unwrap();
        let model = crate::config::AgentConfig::default().llm.model;
        assert!(provider.available_models().contains(&model));
    }

    #[test]
    fn test_config_from_section() {
        let mut section = crate::config::AgentConfig::default().llm;
        let config = OpenAiConfig::from_section(&section, "k".to_string());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        section.base_url = Some("http://localhost:8080/v1/".to_string());
        let config = OpenAiConfig::from_section(&section, "k".to_string());
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_wire_request_omits_empty_tools() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            model: "gpt-4o-mini".to_string(),
            max_tokens: Some(100),
            temperature: None,
            tools: vec![],
        };

        let value = serde_json::to_value(OpenAiProvider::build_wire_request(&request)).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 100);
        assert!(value.get("temperature").is_none());
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_wire_request_includes_tools() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("what time is it?")],
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            temperature: Some(0.2),
            tools: vec![ToolDescription {
                name: "current_time".to_string(),
                description: "Current time".to_string(),
                parameters: json!({"type": "object"}),
            }],
        };

        let value = serde_json::to_value(OpenAiProvider::build_wire_request(&request)).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "current_time");
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(OpenAiProvider::finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(
            OpenAiProvider::finish_reason(Some("tool_calls")),
            FinishReason::ToolCalls
        );
        assert_eq!(OpenAiProvider::finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(OpenAiProvider::finish_reason(None), FinishReason::Other);
    }

    #[test]
    fn test_unparseable_tool_arguments_are_dropped() {
        let calls = vec![
            WireToolCall {
                id: "a".to_string(),
                function: WireFunctionCall {
                    name: "current_time".to_string(),
                    arguments: "{}".to_string(),
                },
            },
            WireToolCall {
                id: "b".to_string(),
                function: WireFunctionCall {
                    name: "current_time".to_string(),
                    arguments: "{not json".to_string(),
                },
            },
        ];

        let extracted = OpenAiProvider::extract_tool_calls(&calls);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].id, "a");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimitExceeded(_)
        ));
        assert!(OpenAiProvider::classify_status(StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!OpenAiProvider::classify_status(StatusCode::BAD_REQUEST, "").is_retryable());
    }
}
