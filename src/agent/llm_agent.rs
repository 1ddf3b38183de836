//! Agent backed by a chat-completion model with tool access
//!
//! Each invocation rebuilds the conversation from the task history, then
//! loops: ask the model, run any tools it requested, feed the results back,
//! until the model answers without tool calls or the iteration cap is hit.

use super::{Agent, AgentInvocationError, AgentReply};
use crate::config::LlmSection;
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ToolCall};
use crate::observability::metrics;
use crate::protocol::task::{Message, Part, Role};
use crate::tools::ToolSystem;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LlmAgent {
    name: String,
    llm: LlmSection,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolSystem>,
    max_tool_iterations: usize,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        llm: LlmSection,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolSystem>,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            name: name.into(),
            llm,
            provider,
            tools,
            max_tool_iterations,
        }
    }

    /// System prompt with the current date appended for temporal context
    fn system_message(&self) -> ChatMessage {
        let now = chrono::Local::now();
        ChatMessage::system(format!(
            "{}\n\nCurrent date and time: {}",
            self.llm.system_prompt,
            now.format("%Y-%m-%d %H:%M:%S %:z")
        ))
    }

    /// Render one task message as chat content; data and file parts become JSON
    fn render_parts(message: &Message) -> String {
        message
            .parts
            .iter()
            .map(|part| match part {
                Part::Text { text } => text.clone(),
                Part::Data { data } => data.to_string(),
                Part::File { file } => format!("[file] {file}"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn build_conversation(&self, history: &[Message]) -> Vec<ChatMessage> {
        std::iter::once(self.system_message())
            .chain(history.iter().map(|message| {
                let content = Self::render_parts(message);
                match message.role {
                    Role::User => ChatMessage::user(content),
                    Role::Agent => ChatMessage::assistant(content),
                }
            }))
            .collect()
    }

    fn completion_request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        CompletionRequest {
            messages,
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            tools: self.tools.descriptions(),
        }
    }

    /// Tool failures are reported back to the model rather than aborting
    async fn run_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            debug!(tool = %call.name, arguments = %call.arguments, "Executing tool");
            match self.tools.execute_tool(&call.name, &call.arguments).await {
                Ok(output) => {
                    metrics().tool_executed(&call.name, true);
                    results.push(format!("Tool {} returned: {}", call.name, output));
                }
                Err(e) => {
                    metrics().tool_executed(&call.name, false);
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    results.push(format!("Tool {} failed: {}", call.name, e));
                }
            }
        }
        results
    }

    fn final_text(response: &CompletionResponse) -> String {
        response
            .content
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or("(no response)")
            .to_string()
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        session_id: &str,
        history: &[Message],
    ) -> Result<AgentReply, AgentInvocationError> {
        if !history.iter().any(|m| m.role == Role::User) {
            return Err(AgentInvocationError::EmptyHistory);
        }

        let mut conversation = self.build_conversation(history);
        let mut iteration = 0;

        loop {
            iteration += 1;
            if iteration > self.max_tool_iterations {
                return Err(AgentInvocationError::IterationLimit(self.max_tool_iterations));
            }

            let response = self
                .provider
                .complete(self.completion_request(conversation.clone()))
                .await?;

            if !response.has_tool_calls() {
                info!(
                    session_id = %session_id,
                    iterations = iteration,
                    total_tokens = response.usage.total_tokens,
                    "LLM produced final answer"
                );
                return Ok(AgentReply::complete(Message::agent_text(Self::final_text(
                    &response,
                ))));
            }

            debug!(
                session_id = %session_id,
                iteration,
                tool_count = response.tool_calls.len(),
                "Processing tool calls"
            );

            if let Some(content) = response.content.as_deref().filter(|c| !c.is_empty()) {
                conversation.push(ChatMessage::assistant(content));
            }
            let results = self.run_tool_calls(&response.tool_calls).await;
            conversation.push(ChatMessage::user(format!(
                "Tool results:\n{}",
                results.join("\n")
            )));
        }
    }
}
