//! Error types for the A2A task server
//!
//! [`A2aError`] covers everything that surfaces to the caller as a JSON-RPC
//! error: malformed envelopes, unknown methods, invalid params and attempts to
//! mutate a task that already reached a terminal state. Agent failures are not
//! part of this taxonomy; they end up as FAILED tasks inside successful
//! responses (see [`crate::agent::AgentInvocationError`]).

use crate::protocol::json_rpc::{error_codes, JsonRpcError};
use crate::protocol::task::TaskState;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use thiserror::Error;

/// Protocol-level and task-state errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum A2aError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Task {task_id} is {state} and no longer accepts input")]
    InvalidTaskState { task_id: String, state: TaskState },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl A2aError {
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn method_not_found<S: Into<String>>(method: S) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params<S: Into<String>>(message: S) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn task_not_found<S: Into<String>>(task_id: S) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            A2aError::Parse { .. } => error_codes::PARSE_ERROR,
            A2aError::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            A2aError::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            A2aError::InvalidParams { .. } => error_codes::INVALID_PARAMS,
            A2aError::TaskNotFound { .. } => error_codes::TASK_NOT_FOUND,
            A2aError::InvalidTaskState { .. } => error_codes::INVALID_TASK_STATE,
            A2aError::Internal { .. } => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert into the JSON-RPC error object placed in a response
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            A2aError::InvalidTaskState { task_id, state } => {
                Some(json!({"taskId": task_id, "state": state}))
            }
            A2aError::TaskNotFound { task_id } => Some(json!({"taskId": task_id})),
            _ => None,
        };

        JsonRpcError {
            code: self.code(),
            message: sanitize_error_message(&self.to_string()),
            data,
        }
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Redact credentials and sensitive paths, then cap the length.
///
/// Applied to every error text that leaves the process, including failure
/// details embedded in FAILED tasks.
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .into_owned();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_ERROR_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(suffix);
    }

    sanitized
}

/// Result type for task and protocol operations
pub type A2aResult<T> = Result<T, A2aError>;
