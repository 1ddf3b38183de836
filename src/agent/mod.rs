//! Agent invocation boundary
//!
//! The task manager hands an [`Agent`] the full message history of a task and
//! gets back either the next agent message or an [`AgentInvocationError`].
//! Nothing in here knows about JSON-RPC or task states.

pub mod llm_agent;

pub use llm_agent::LlmAgent;

use crate::llm::LlmError;
use crate::protocol::task::Message;
use crate::tools::ToolError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// The agent's answer to one turn
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub message: Message,
    /// `false` keeps the task WORKING so the caller can send another turn
    pub task_complete: bool,
}

impl AgentReply {
    /// Reply that closes the task
    pub fn complete(message: Message) -> Self {
        Self {
            message,
            task_complete: true,
        }
    }

    /// Reply that asks the caller for more input
    pub fn needs_input(message: Message) -> Self {
        Self {
            message,
            task_complete: false,
        }
    }
}

/// Why an agent could not produce a reply.
///
/// `Display` is the human-readable cause shown to the caller inside the
/// FAILED task.
#[derive(Debug, Error)]
pub enum AgentInvocationError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool execution failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Tool execution exceeded maximum iterations ({0})")]
    IterationLimit(usize),

    #[error("Agent did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Task history contains no user message")]
    EmptyHistory,

    #[error("Agent failed: {0}")]
    Failed(String),
}

/// Something that can answer a task
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Produce the next agent message for `history`.
    ///
    /// `history` holds every message of the task so far, the newest user turn
    /// last. The call may take arbitrarily long; the caller bounds it.
    async fn invoke(
        &self,
        session_id: &str,
        history: &[Message],
    ) -> Result<AgentReply, AgentInvocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_constructors() {
        let done = AgentReply::complete(Message::agent_text("12:00"));
        assert!(done.task_complete);

        let open = AgentReply::needs_input(Message::agent_text("Which timezone?"));
        assert!(!open.task_complete);
        assert_eq!(open.message.text(), "Which timezone?");
    }

    #[test]
    fn test_error_display_is_human_readable() {
        let timeout = AgentInvocationError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.to_string(), "Agent did not respond within 30s");

        let llm = AgentInvocationError::from(LlmError::NetworkError("connection refused".into()));
        assert!(llm.to_string().contains("connection refused"));
    }
}
