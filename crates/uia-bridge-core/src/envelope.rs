//! The runtime's reply to an executed script.
//!
//! Every command script ends by building `{sessionId, status, value}`. Status
//! 0 is success and `value` is the command's result; any other status is an
//! automation failure with `value` as its detail. The bridge does not
//! interpret status codes beyond that split; [`runtime_status_name`] only
//! labels the well-known ones for error reporting.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::error::CommandError;

pub const STATUS_SUCCESS: i64 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("reply is not valid JSON: {0}")]
    NotJson(String),
    #[error("reply must be a JSON object")]
    NotAnObject,
    #[error("reply has no 'status'")]
    MissingStatus,
    #[error("reply 'status' must be an integer, got {0}")]
    InvalidStatus(String),
    #[error("reply 'sessionId' must be a string")]
    InvalidSessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: i64,
    #[serde(default)]
    pub value: Value,
}

impl ResponseEnvelope {
    pub fn success(session_id: &str, value: Value) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            status: STATUS_SUCCESS,
            value,
        }
    }

    pub fn failure(session_id: &str, status: i64, value: Value) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            status,
            value,
        }
    }

    /// Parse the raw text the runtime produced.
    pub fn parse(reply: &str) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_str(reply.trim()).map_err(|e| EnvelopeError::NotJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let status = match fields.get("status") {
            None => return Err(EnvelopeError::MissingStatus),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| EnvelopeError::InvalidStatus(n.to_string()))?,
            Some(other) => return Err(EnvelopeError::InvalidStatus(other.to_string())),
        };

        let session_id = match fields.remove("sessionId") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(EnvelopeError::InvalidSessionId),
        };

        Ok(Self {
            session_id,
            status,
            value: fields.remove("value").unwrap_or(Value::Null),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Success unwraps to `value`; a failure status becomes a runtime error
    /// carrying `value` as detail.
    pub fn into_result(self) -> Result<Value, CommandError> {
        if self.is_success() {
            Ok(self.value)
        } else {
            Err(CommandError::Runtime {
                session_id: self.session_id,
                status: self.status,
                value: self.value,
            })
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "sessionId": self.session_id,
            "status": self.status,
            "value": self.value
        })
    }
}

/// Name of a JSON wire protocol status code, for the codes runtimes commonly
/// send back.
pub fn runtime_status_name(status: i64) -> Option<&'static str> {
    Some(match status {
        0 => "success",
        6 => "no such session",
        7 => "no such element",
        8 => "no such frame",
        9 => "unknown command",
        10 => "stale element reference",
        11 => "element not visible",
        12 => "invalid element state",
        13 => "unknown error",
        15 => "element is not selectable",
        17 => "javascript error",
        19 => "xpath lookup error",
        21 => "timeout",
        23 => "no such window",
        26 => "unexpected alert open",
        28 => "script timeout",
        32 => "invalid selector",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_envelope() {
        let env = ResponseEnvelope::parse(r#"{"sessionId":"abc123","status":0,"value":[{"ELEMENT":"3"}]}"#)
            .unwrap();
        assert_eq!(env.session_id.as_deref(), Some("abc123"));
        assert!(env.is_success());
        let value = env.into_result().unwrap();
        assert_eq!(value[0]["ELEMENT"], "3");
    }

    #[test]
    fn test_failure_status_is_runtime_error() {
        let env = ResponseEnvelope::parse(r#"{"status":13,"value":"no such element"}"#).unwrap();
        assert_eq!(env.session_id, None);
        match env.into_result() {
            Err(CommandError::Runtime { status, value, .. }) => {
                assert_eq!(status, 13);
                assert_eq!(value, "no such element");
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_value_is_null() {
        let env = ResponseEnvelope::parse(r#"{"sessionId":"s","status":0}"#).unwrap();
        assert_eq!(env.value, Value::Null);
    }

    #[test]
    fn test_rejects_malformed_replies() {
        assert!(matches!(
            ResponseEnvelope::parse("not json"),
            Err(EnvelopeError::NotJson(_))
        ));
        assert_eq!(
            ResponseEnvelope::parse("[]"),
            Err(EnvelopeError::NotAnObject)
        );
        assert_eq!(
            ResponseEnvelope::parse(r#"{"value":1}"#),
            Err(EnvelopeError::MissingStatus)
        );
        assert_eq!(
            ResponseEnvelope::parse(r#"{"status":"0"}"#),
            Err(EnvelopeError::InvalidStatus("\"0\"".into()))
        );
        assert_eq!(
            ResponseEnvelope::parse(r#"{"status":0,"sessionId":5}"#),
            Err(EnvelopeError::InvalidSessionId)
        );
    }

    #[test]
    fn test_to_json_shape() {
        let env = ResponseEnvelope::success("abc123", json!(true));
        assert_eq!(
            env.to_json(),
            json!({"sessionId": "abc123", "status": 0, "value": true})
        );
    }

    #[test]
    fn test_status_names() {
        assert_eq!(runtime_status_name(7), Some("no such element"));
        assert_eq!(runtime_status_name(10), Some("stale element reference"));
        assert_eq!(runtime_status_name(999), None);
    }
}
