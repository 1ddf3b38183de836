//! HTTP client for A2A agents
//!
//! Speaks the same JSON-RPC dialect the server exposes. JSON-RPC error
//! objects surface as [`ClientError::Rpc`]; a FAILED task is still a
//! successful call and comes back as a [`Task`].

use crate::protocol::agent_card::AgentCard;
use crate::protocol::json_rpc::{A2aMethod, JsonRpcRequest, JsonRpcResponse};
use crate::protocol::task::{Message, Task, TaskQueryParams, TaskSendParams};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid agent URL: {0}")]
    InvalidUrl(String),
    #[error("Agent returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid JSON from agent: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i32, message: String },
}

/// Client bound to one agent base URL
#[derive(Debug, Clone)]
pub struct A2aClient {
    base_url: Url,
    client: Client,
}

impl A2aClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the discovery document
    pub async fn agent_card(&self) -> Result<AgentCard, ClientError> {
        let url = self
            .base_url
            .join(".well-known/agent.json")
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// `tasks/send` with an explicit task id
    pub async fn send_task(&self, params: &TaskSendParams) -> Result<Task, ClientError> {
        self.call(A2aMethod::SendTask, params).await
    }

    /// Convenience wrapper sending a single user text turn
    pub async fn send_text(
        &self,
        task_id: &str,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<Task, ClientError> {
        let params = TaskSendParams::new(
            task_id,
            session_id.map(str::to_string),
            Message::user_text(text),
        );
        self.send_task(&params).await
    }

    /// `tasks/get`
    pub async fn get_task(
        &self,
        task_id: &str,
        history_length: Option<usize>,
    ) -> Result<Task, ClientError> {
        let params = TaskQueryParams {
            task_id: task_id.to_string(),
            history_length,
        };
        self.call(A2aMethod::GetTask, &params).await
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: A2aMethod,
        params: &P,
    ) -> Result<R, ClientError> {
        let request = JsonRpcRequest::new(method, serde_json::to_value(params)?);
        debug!(method = method.as_str(), id = ?request.id, "Sending JSON-RPC request");

        let response = self
            .client
            .post(self.base_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonRpcResponse = serde_json::from_str(&body)?;
        if let Some(error) = envelope.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = envelope.result.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(result)?)
    }
}
