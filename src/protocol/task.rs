//! Task, message and status payloads
//!
//! A [`Task`] is the aggregate tracked by the server: an id, the session it
//! belongs to, its append-only message history and its current status.
//!
//! # Examples
//! ```
//! use a2a_agent::protocol::{Message, Task, TaskState};
//!
//! let mut task = Task::new("t1", "session-1");
//! task.append_message(Message::user_text("what time is it?"));
//! task.transition(TaskState::Working, None).unwrap();
//!
//! assert_eq!(task.status.state, TaskState::Working);
//! assert_eq!(task.messages.len(), 1);
//! ```

use crate::error::{A2aError, A2aResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// One piece of message content.
///
/// Data and file parts are carried through untouched; only text parts are
/// interpreted by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File { file: Value },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of all text parts, newline separated
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Forward-only transition rule. WORKING → WORKING is a further turn of
    /// an open multi-turn task.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Submitted, TaskState::Working) => true,
            (TaskState::Working, TaskState::Working) => true,
            (TaskState::Submitted | TaskState::Working, TaskState::Canceled) => true,
            (TaskState::Working, TaskState::Completed | TaskState::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "SUBMITTED",
            TaskState::Working => "WORKING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
            TaskState::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a task. Flattened into the task on the wire as
/// `status`, `statusTimestamp` and `statusMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(rename = "status")]
    pub state: TaskState,
    #[serde(rename = "statusTimestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(
        rename = "statusMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<Message>,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
            message,
        }
    }
}

/// Failure detail embedded in a FAILED task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    pub code: i32,
    pub message: String,
}

/// The task aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "taskId")]
    pub id: String,
    pub session_id: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    /// Append-only history of user and agent turns, in arrival order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// The agent's final message once the task reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl Task {
    /// Create a task in SUBMITTED state with an empty history
    pub fn new(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            status: TaskStatus::new(TaskState::Submitted, None),
            messages: Vec::new(),
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Move to `next`, refusing any transition the lifecycle does not allow
    pub fn transition(&mut self, next: TaskState, message: Option<Message>) -> A2aResult<()> {
        if !self.status.state.can_transition_to(next) {
            return Err(A2aError::InvalidTaskState {
                task_id: self.id.clone(),
                state: self.status.state,
            });
        }
        self.status = TaskStatus::new(next, message);
        Ok(())
    }

    /// Record the agent's final reply and close the task
    pub fn complete(&mut self, reply: Message) -> A2aResult<()> {
        self.transition(TaskState::Completed, None)?;
        self.messages.push(reply.clone());
        self.result = Some(reply);
        Ok(())
    }

    /// Record a failure as the task's result and close the task
    pub fn fail(&mut self, reply: Message, error: TaskError) -> A2aResult<()> {
        self.transition(TaskState::Failed, Some(reply.clone()))?;
        self.messages.push(reply.clone());
        self.result = Some(reply);
        self.error = Some(error);
        Ok(())
    }

    /// Snapshot with the history trimmed to its last `limit` messages
    pub fn with_history_limit(&self, limit: Option<usize>) -> Task {
        let mut snapshot = self.clone();
        if let Some(limit) = limit {
            let skip = snapshot.messages.len().saturating_sub(limit);
            snapshot.messages.drain(..skip);
        }
        snapshot
    }

    pub fn last_agent_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Agent)
    }
}

/// Parameters of `tasks/send`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message: Message,
}

impl TaskSendParams {
    pub fn new(task_id: impl Into<String>, session_id: Option<String>, message: Message) -> Self {
        Self {
            task_id: Some(task_id.into()),
            session_id,
            message,
        }
    }

    /// Semantic checks serde cannot express
    pub fn validate(&self) -> A2aResult<()> {
        if matches!(self.task_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(A2aError::invalid_params("taskId must not be empty"));
        }
        if matches!(self.session_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(A2aError::invalid_params("sessionId must not be empty"));
        }
        if self.message.role != Role::User {
            return Err(A2aError::invalid_params("message role must be \"user\""));
        }
        if self.message.parts.is_empty() {
            return Err(A2aError::invalid_params(
                "message must contain at least one part",
            ));
        }
        Ok(())
    }
}

/// Parameters of `tasks/get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    #[serde(alias = "id")]
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}
