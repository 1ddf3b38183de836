//! JSON-RPC dispatcher
//!
//! Turns a raw request body into exactly one response envelope. Every failure
//! along the way (bad JSON, bad envelope, unknown method, bad params, task
//! errors) becomes an error response carrying the request id whenever it
//! could be read.

use crate::error::{A2aError, A2aResult};
use crate::observability::metrics;
use crate::protocol::json_rpc::{A2aMethod, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::protocol::task::{TaskQueryParams, TaskSendParams};
use crate::rpc_span;
use crate::task::TaskManager;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, Instrument};

#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<TaskManager>,
}

impl Dispatcher {
    pub fn new(manager: Arc<TaskManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<TaskManager> {
        &self.manager
    }

    /// Process one request body
    pub async fn handle(&self, body: &[u8]) -> JsonRpcResponse {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => return Self::error_response(None, A2aError::parse(e.to_string())),
        };

        let request = match JsonRpcRequest::from_value(value) {
            Ok(request) => request,
            Err((id, error)) => return Self::error_response(id, error),
        };

        let span = rpc_span!(method = %request.method, id = ?request.id);
        self.route(request).instrument(span).await
    }

    async fn route(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        metrics().rpc_request(&method);

        let Some(method) = A2aMethod::from_name(&method) else {
            return Self::error_response(id, A2aError::method_not_found(method));
        };

        let result = match method {
            A2aMethod::SendTask => match parse_params::<TaskSendParams>(params) {
                Ok(params) => self.manager.on_send_task(params).await,
                Err(e) => Err(e),
            },
            A2aMethod::GetTask => match parse_params::<TaskQueryParams>(params) {
                Ok(params) => self.manager.on_get_task(params).await,
                Err(e) => Err(e),
            },
        };

        match result.and_then(|task| {
            serde_json::to_value(task).map_err(|e| A2aError::internal(e.to_string()))
        }) {
            Ok(value) => {
                debug!(method = method.as_str(), "Request succeeded");
                JsonRpcResponse::success(id, value)
            }
            Err(error) => Self::error_response(id, error),
        }
    }

    fn error_response(id: Option<RequestId>, error: A2aError) -> JsonRpcResponse {
        metrics().rpc_error(error.code());
        debug!(code = error.code(), error = %error, "Request failed");
        JsonRpcResponse::error(id, error.to_rpc_error())
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> A2aResult<T> {
    let params = params.ok_or_else(|| A2aError::invalid_params("params are required"))?;
    serde_json::from_value(params).map_err(|e| A2aError::invalid_params(e.to_string()))
}
