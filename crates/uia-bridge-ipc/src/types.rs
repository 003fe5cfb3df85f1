use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use uia_bridge_common::Payload;
use uia_bridge_common::PayloadError;
use uia_bridge_common::SessionId;

use crate::error_codes;

/// One command as it arrives on the wire.
///
/// ```json
/// {"jsonrpc":"2.0","id":1,"method":"findElementRoot",
///  "params":{"session":"abc123","payload":{"depth":2,"criteria":"..."}}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            _jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref()?.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(|v| v.as_str())
    }

    #[allow(clippy::result_large_err)]
    pub fn require_str(&self, key: &str) -> Result<&str, RpcResponse> {
        self.param_str(key).ok_or_else(|| {
            RpcResponse::error(
                self.id,
                error_codes::INVALID_PARAMS,
                &format!("Missing '{}' param", key),
            )
        })
    }

    /// The session the command targets. Required for every command.
    #[allow(clippy::result_large_err)]
    pub fn session(&self) -> Result<SessionId, RpcResponse> {
        let raw = self.require_str("session")?;
        SessionId::try_new(raw).map_err(|e| {
            RpcResponse::error(self.id, error_codes::INVALID_PARAMS, &e.to_string())
        })
    }

    /// The command body. An absent `payload` is an empty object; anything
    /// other than an object is a payload error for the handler to report.
    pub fn payload(&self) -> Result<Payload, PayloadError> {
        match self.param("payload") {
            None => Ok(Payload::empty()),
            Some(value) => Payload::new(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RpcServerError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcServerError {
    code: i32,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcServerError {
    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorData {
    pub category: String,
    pub stage: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            _jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, code: i32, message: &str) -> Self {
        Self {
            _jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcServerError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    pub fn error_with_data(id: u64, code: i32, message: &str, error_data: ErrorData) -> Self {
        Self {
            _jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcServerError {
                code,
                message: message.to_string(),
                data: Some(serde_json::to_value(error_data).unwrap_or(json!({}))),
            }),
        }
    }

    pub fn domain_error(
        id: u64,
        code: i32,
        message: &str,
        stage: &str,
        context: Option<Value>,
        suggestion: Option<String>,
    ) -> Self {
        Self::error_with_data(
            id,
            code,
            message,
            ErrorData {
                category: error_codes::category_for_code(code).as_str().to_string(),
                stage: stage.to_string(),
                retryable: error_codes::is_retryable(code),
                context,
                suggestion,
            },
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error_info(&self) -> Option<&RpcServerError> {
        self.error.as_ref()
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(params: Option<Value>) -> RpcRequest {
        RpcRequest::new(1, "findElementRoot", params)
    }

    #[test]
    fn test_deserialize_wire_request() {
        let line = r#"{"jsonrpc":"2.0","id":7,"method":"click","params":{"session":"s1","payload":{"reference":"3"}}}"#;
        let req: RpcRequest = serde_json::from_str(line).unwrap();
        assert_eq!(req.id, 7);
        assert_eq!(req.method, "click");
        assert_eq!(req.session().unwrap().as_str(), "s1");
        assert_eq!(req.payload().unwrap().get_string("reference").unwrap(), "3");
    }

    #[test]
    fn test_session_is_required() {
        let req = make_request(Some(json!({"payload": {}})));
        let resp = req.session().unwrap_err();
        assert_eq!(resp.error_code(), Some(error_codes::INVALID_PARAMS));
    }

    #[test]
    fn test_blank_session_is_rejected() {
        let req = make_request(Some(json!({"session": "  "})));
        assert!(req.session().is_err());
    }

    #[test]
    fn test_missing_payload_is_empty() {
        let req = make_request(Some(json!({"session": "s1"})));
        assert!(req.payload().unwrap().as_map().is_empty());
    }

    #[test]
    fn test_non_object_payload_is_payload_error() {
        let req = make_request(Some(json!({"session": "s1", "payload": [1]})));
        assert!(matches!(
            req.payload(),
            Err(PayloadError::NotAnObject { found: "array" })
        ));
    }

    #[test]
    fn test_response_success_format() {
        let resp = RpcResponse::success(42, json!({"data": "test"}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":42"));
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_response_error_format() {
        let resp = RpcResponse::error(99, error_codes::INVALID_REQUEST, "Invalid Request");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"code\":-32600"));
        assert!(!json.contains("\"result\""));
    }

    #[test]
    fn test_domain_error_carries_category_and_stage() {
        let resp = RpcResponse::domain_error(
            3,
            error_codes::PAYLOAD_ERROR,
            "error parsing the payload",
            "payload",
            Some(json!({"field": "depth"})),
            None,
        );
        let err = resp.error_info().unwrap();
        let data = err.data().unwrap();
        assert_eq!(data["category"], "invalid_input");
        assert_eq!(data["stage"], "payload");
        assert_eq!(data["retryable"], false);
        assert_eq!(data["context"]["field"], "depth");
        assert!(data.get("suggestion").is_none());
    }
}
