//! Errors of the command bridge.
//!
//! Translation failures (bad payload, broken template pairing) are wrapped once
//! in [`TranslationError`] at the handler boundary. Everything a caller can
//! observe is a [`CommandError`], which maps to a JSON-RPC error code and
//! carries structured context the way daemon errors do.

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use uia_bridge_common::PayloadError;
use uia_bridge_ipc::error_codes::{self, ErrorCategory};

use crate::envelope::EnvelopeError;
use crate::envelope::runtime_status_name;
use crate::script::TemplateError;

/// Where in the request's life an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Extracting fields from the payload
    Payload,
    /// Rendering the command's template
    Template,
    /// Looking up the handler for a command name
    Dispatch,
    /// Sending the script to the runtime and reading its reply
    Execution,
    /// The runtime ran the script and reported a failure status
    Runtime,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Payload => "payload",
            Stage::Template => "template",
            Stage::Dispatch => "dispatch",
            Stage::Execution => "execution",
            Stage::Runtime => "runtime",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationCause {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A command could not be turned into a script.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("error parsing the payload for '{command}'")]
pub struct TranslationError {
    command: String,
    #[source]
    cause: TranslationCause,
}

impl TranslationError {
    pub fn new(command: &str, cause: impl Into<TranslationCause>) -> Self {
        Self {
            command: command.to_string(),
            cause: cause.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cause(&self) -> &TranslationCause {
        &self.cause
    }

    pub fn stage(&self) -> Stage {
        match self.cause {
            TranslationCause::Payload(_) => Stage::Payload,
            TranslationCause::Template(_) => Stage::Template,
        }
    }

    pub fn payload_error(&self) -> Option<&PayloadError> {
        match &self.cause {
            TranslationCause::Payload(e) => Some(e),
            TranslationCause::Template(_) => None,
        }
    }

    pub fn template_error(&self) -> Option<&TemplateError> {
        match &self.cause {
            TranslationCause::Template(e) => Some(e),
            TranslationCause::Payload(_) => None,
        }
    }
}

/// Every failure a command can end in, as seen by the protocol caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("session '{session_id}' is busy executing another script")]
    SessionBusy { session_id: String },
    #[error("script execution failed: {reason}")]
    Execution { reason: String },
    #[error("script for session '{session_id}' did not finish within {timeout_ms}ms")]
    ScriptTimeout { session_id: String, timeout_ms: u64 },
    #[error("malformed runtime reply: {0}")]
    MalformedReply(#[from] EnvelopeError),
    #[error("runtime replied for session '{actual}' to a command for session '{expected}'")]
    SessionMismatch { expected: String, actual: String },
    #[error("runtime reported status {status}{}", runtime_detail(.value))]
    Runtime {
        session_id: Option<String>,
        status: i64,
        value: Value,
    },
}

fn runtime_detail(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() => format!(": {}", s),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => format!(": {}", message),
            None => String::new(),
        },
        _ => String::new(),
    }
}

impl CommandError {
    pub fn stage(&self) -> Stage {
        match self {
            CommandError::Translation(e) => e.stage(),
            CommandError::UnknownCommand { .. } => Stage::Dispatch,
            CommandError::SessionBusy { .. }
            | CommandError::Execution { .. }
            | CommandError::ScriptTimeout { .. }
            | CommandError::MalformedReply(_)
            | CommandError::SessionMismatch { .. } => Stage::Execution,
            CommandError::Runtime { .. } => Stage::Runtime,
        }
    }

    pub fn is_translation(&self) -> bool {
        matches!(self, CommandError::Translation(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, CommandError::Runtime { .. })
    }

    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            CommandError::Translation(e) => match e.stage() {
                Stage::Template => error_codes::TEMPLATE_ERROR,
                _ => error_codes::PAYLOAD_ERROR,
            },
            CommandError::UnknownCommand { .. } => error_codes::METHOD_NOT_FOUND,
            CommandError::SessionBusy { .. } => error_codes::SESSION_BUSY,
            CommandError::Execution { .. } => error_codes::EXECUTION_ERROR,
            CommandError::ScriptTimeout { .. } => error_codes::SCRIPT_TIMEOUT,
            CommandError::MalformedReply(_) => error_codes::MALFORMED_REPLY,
            CommandError::SessionMismatch { .. } => error_codes::SESSION_MISMATCH,
            CommandError::Runtime { .. } => error_codes::RUNTIME_ERROR,
        }
    }

    /// Returns the error category for programmatic handling.
    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            CommandError::Translation(e) => {
                let mut ctx = json!({
                    "command": e.command(),
                    "cause": e.cause().to_string()
                });
                match e.cause() {
                    TranslationCause::Payload(p) => {
                        if let Some(field) = p.field() {
                            ctx["field"] = json!(field);
                        }
                        if let Some(expected) = p.expected() {
                            ctx["expected_type"] = json!(expected.to_string());
                        }
                    }
                    TranslationCause::Template(t) => {
                        ctx["placeholder"] = json!(t.placeholder());
                    }
                }
                ctx
            }
            CommandError::UnknownCommand { command } => json!({ "command": command }),
            CommandError::SessionBusy { session_id } => json!({ "session_id": session_id }),
            CommandError::Execution { reason } => json!({ "reason": reason }),
            CommandError::ScriptTimeout {
                session_id,
                timeout_ms,
            } => json!({ "session_id": session_id, "timeout_ms": timeout_ms }),
            CommandError::MalformedReply(e) => json!({ "reason": e.to_string() }),
            CommandError::SessionMismatch { expected, actual } => {
                json!({ "expected_session_id": expected, "actual_session_id": actual })
            }
            CommandError::Runtime {
                session_id,
                status,
                value,
            } => {
                let mut ctx = json!({ "status": status, "value": value });
                if let Some(sid) = session_id {
                    ctx["session_id"] = json!(sid);
                }
                if let Some(name) = runtime_status_name(*status) {
                    ctx["status_name"] = json!(name);
                }
                ctx
            }
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            CommandError::Translation(e) => match e.cause() {
                TranslationCause::Payload(PayloadError::Missing { field }) => {
                    format!("Add the required '{}' field to the payload.", field)
                }
                TranslationCause::Payload(PayloadError::WrongType {
                    field, expected, ..
                }) => format!("Send '{}' as {}. Values are not converted.", field, expected),
                TranslationCause::Payload(_) => {
                    "Check the payload against the command's fields.".to_string()
                }
                TranslationCause::Template(_) => {
                    "The command's script template is out of step with its handler. Report this as a bug."
                        .to_string()
                }
            },
            CommandError::UnknownCommand { .. } => {
                "Call 'commands' to list the supported commands.".to_string()
            }
            CommandError::SessionBusy { .. } => {
                "Another script is running in this session. Retry when it finishes.".to_string()
            }
            CommandError::Execution { .. } | CommandError::MalformedReply(_) => {
                "The automation runtime did not answer properly. Check that it is running."
                    .to_string()
            }
            CommandError::ScriptTimeout { .. } => {
                "The script is still running on the device or the runtime hung. Raise UIA_BRIDGE_SCRIPT_TIMEOUT for slow operations."
                    .to_string()
            }
            CommandError::SessionMismatch { .. } => {
                "The runtime answered for a different session. Restart the session.".to_string()
            }
            CommandError::Runtime { status, .. } => match *status {
                7 => "No element matched. Check the criteria or search from the root.".to_string(),
                10 => "The element reference is stale. Find the element again.".to_string(),
                6 => "The session no longer exists on the device.".to_string(),
                _ => "The runtime could not perform the operation. See 'value' for details."
                    .to_string(),
            },
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        error_codes::is_retryable(self.code())
    }
}
