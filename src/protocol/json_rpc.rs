//! JSON-RPC 2.0 envelope types
//!
//! Requests arrive as `{jsonrpc, id, method, params}` and every reply is
//! `{jsonrpc, id, result}` or `{jsonrpc, id, error}`. The `id` supplied by the
//! caller is echoed back unchanged; an absent id is answered with `null`.

use crate::error::A2aError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The only protocol version accepted on the wire
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and application-range JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
    pub const INVALID_TASK_STATE: i32 = -32002;
    /// Carried inside a FAILED task, never returned as a response error
    pub const AGENT_INVOCATION_FAILED: i32 = -32003;
}

/// Request identifier: a string or a number, echoed back verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
}

impl RequestId {
    /// Extract the id from a raw envelope value.
    ///
    /// `Ok(None)` for a missing or null id, `Err(())` for an id of any other
    /// JSON type (objects, arrays, booleans are not valid identifiers).
    #[allow(clippy::result_unit_err)]
    pub fn from_value(value: Option<&Value>) -> Result<Option<Self>, ()> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(RequestId::String(s.clone()))),
            Some(Value::Number(n)) => Ok(Some(RequestId::Number(n.clone()))),
            Some(_) => Err(()),
        }
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value.into())
    }
}

/// Methods registered on the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A2aMethod {
    SendTask,
    GetTask,
}

impl A2aMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tasks/send" => Some(A2aMethod::SendTask),
            "tasks/get" => Some(A2aMethod::GetTask),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            A2aMethod::SendTask => "tasks/send",
            A2aMethod::GetTask => "tasks/get",
        }
    }
}

/// JSON-RPC request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build an outbound request with a fresh string id
    pub fn new(method: A2aMethod, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(RequestId::String(Uuid::new_v4().simple().to_string())),
            method: method.as_str().to_string(),
            params: Some(params),
        }
    }

    /// Validate a parsed JSON value as a request envelope.
    ///
    /// On failure the id is returned alongside the error whenever it could be
    /// recovered, so the error response can still echo it.
    pub fn from_value(value: Value) -> Result<Self, (Option<RequestId>, A2aError)> {
        let Value::Object(mut object) = value else {
            return Err((
                None,
                A2aError::invalid_request("request must be a single JSON object"),
            ));
        };

        let id = RequestId::from_value(object.get("id")).map_err(|_| {
            (
                None,
                A2aError::invalid_request("id must be a string, a number or null"),
            )
        })?;

        match object.get("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            _ => {
                return Err((
                    id,
                    A2aError::invalid_request(format!("jsonrpc must be \"{JSONRPC_VERSION}\"")),
                ))
            }
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            _ => {
                return Err((id, A2aError::invalid_request("method must be a string")));
            }
        };

        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method,
            params: object.remove("params"),
        })
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC response envelope; exactly one of `result` and `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_from_valid_envelope() {
        let request = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tasks/send",
            "params": {"taskId": "t1"}
        }))
        .unwrap();

        assert_eq!(request.id, Some(RequestId::from(7)));
        assert_eq!(request.method, "tasks/send");
        assert_eq!(request.params, Some(json!({"taskId": "t1"})));
    }

    #[test]
    fn test_request_rejects_wrong_version_but_keeps_id() {
        let (id, error) = JsonRpcRequest::from_value(json!({
            "jsonrpc": "1.0",
            "id": "abc",
            "method": "tasks/send"
        }))
        .unwrap_err();

        assert_eq!(id, Some(RequestId::from("abc")));
        assert_eq!(error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_request_rejects_non_object() {
        let (id, error) = JsonRpcRequest::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(id.is_none());
        assert_eq!(error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_request_rejects_structured_id() {
        let (id, error) = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0",
            "id": {"nested": true},
            "method": "tasks/send"
        }))
        .unwrap_err();
        assert!(id.is_none());
        assert_eq!(error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_request_missing_method() {
        let (id, error) =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(id, Some(RequestId::from(1)));
        assert_eq!(error.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_response_serializes_null_id() {
        let response = JsonRpcResponse::error(
            None,
            JsonRpcError {
                code: error_codes::PARSE_ERROR,
                message: "Parse error".to_string(),
                data: None,
            },
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(A2aMethod::from_name("tasks/send"), Some(A2aMethod::SendTask));
        assert_eq!(A2aMethod::from_name("tasks/get"), Some(A2aMethod::GetTask));
        assert_eq!(A2aMethod::from_name("foo/bar"), None);
        assert_eq!(A2aMethod::GetTask.as_str(), "tasks/get");
    }

    #[test]
    fn test_outbound_request_has_string_id() {
        let request = JsonRpcRequest::new(A2aMethod::SendTask, json!({}));
        assert!(matches!(request.id, Some(RequestId::String(ref s)) if s.len() == 32));
        assert_eq!(request.jsonrpc, "2.0");
    }
}
