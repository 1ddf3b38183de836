//! Mock implementations for testing
//!
//! [`MockLlmProvider`] stands in for a chat-completion backend and
//! [`ScriptedAgent`] for a whole agent, so the task manager, dispatcher and
//! HTTP routes can be exercised without network access.

use crate::agent::{Agent, AgentInvocationError, AgentReply};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::protocol::task::{Message, Role};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock LLM provider.
///
/// Scripted tool calls are answered first, one per call, then text responses
/// are returned in rotation.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
    pub should_fail: bool,
    always_call_tool: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Requests one tool call per scripted entry before answering with text
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Never stops asking for `tool_name`
    pub fn always_calling_tool(tool_name: impl Into<String>) -> Self {
        Self {
            always_call_tool: Some(tool_name.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.requests).last().cloned()
    }

    fn response(content: Option<String>, tool_calls: Vec<ToolCall>) -> CompletionResponse {
        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };
        CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason,
            tool_calls,
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request);

        if self.should_fail {
            return Err(LlmError::ApiError("Mock LLM failure".to_string()));
        }

        if let Some(tool_name) = &self.always_call_tool {
            return Ok(Self::response(
                None,
                vec![ToolCall {
                    id: format!("call_{call}"),
                    name: tool_name.clone(),
                    arguments: serde_json::json!({}),
                }],
            ));
        }

        if let Some(tool_call) = self.tool_calls.get(call) {
            return Ok(Self::response(None, vec![tool_call.clone()]));
        }

        let text_index = call - self.tool_calls.len().min(call);
        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[text_index % self.responses.len()].clone()
        };
        Ok(Self::response(Some(content), vec![]))
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::NetworkError("Mock health check failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
enum Script {
    /// Echo the newest user message and complete
    Echo,
    /// Fixed text, completing the task
    Reply(String),
    /// Ask for more input this many times, then echo and complete
    OpenFor(usize),
    Fail(String),
}

/// Agent with canned behavior that records what it was given
#[derive(Debug)]
pub struct ScriptedAgent {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
    history_lengths: Mutex<Vec<usize>>,
}

impl ScriptedAgent {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
            history_lengths: Mutex::new(Vec::new()),
        }
    }

    /// Completes every task with `echo: <latest user text>`
    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_script(Script::Reply(text.into()))
    }

    /// Keeps a task open for `turns` calls before completing it
    pub fn open_for(turns: usize) -> Self {
        Self::with_script(Script::OpenFor(turns))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// History length seen by each invocation, in call order
    pub fn history_lengths(&self) -> Vec<usize> {
        lock(&self.history_lengths).clone()
    }

    fn echo_text(history: &[Message]) -> String {
        let latest = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(Message::text)
            .unwrap_or_default();
        format!("echo: {latest}")
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        _session_id: &str,
        history: &[Message],
    ) -> Result<AgentReply, AgentInvocationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.history_lengths).push(history.len());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.script {
            Script::Echo => Ok(AgentReply::complete(Message::agent_text(Self::echo_text(
                history,
            )))),
            Script::Reply(text) => Ok(AgentReply::complete(Message::agent_text(text.clone()))),
            Script::OpenFor(turns) if call < *turns => Ok(AgentReply::needs_input(
                Message::agent_text(Self::echo_text(history)),
            )),
            Script::OpenFor(_) => Ok(AgentReply::complete(Message::agent_text(Self::echo_text(
                history,
            )))),
            Script::Fail(message) => Err(AgentInvocationError::Failed(message.clone())),
        }
    }
}
