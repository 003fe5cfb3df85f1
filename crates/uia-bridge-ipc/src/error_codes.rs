//! Semantic error codes for JSON-RPC errors.
//!
//! Error codes follow JSON-RPC 2.0:
//! - -32700 to -32600: Reserved protocol errors
//! - -32000 to -32099: Server errors (we use -32007 to -32016 for bridge errors)

// Protocol errors
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// Translation errors (command -> script)
pub const PAYLOAD_ERROR: i32 = -32010;
pub const TEMPLATE_ERROR: i32 = -32011;

// Execution errors (script -> runtime -> envelope)
pub const RUNTIME_ERROR: i32 = -32012;
pub const MALFORMED_REPLY: i32 = -32013;
pub const SESSION_MISMATCH: i32 = -32014;
pub const SCRIPT_TIMEOUT: i32 = -32015;
pub const EXECUTION_ERROR: i32 = -32016;

// Session errors
pub const SESSION_BUSY: i32 = -32007;

// Legacy generic error
pub const GENERIC_ERROR: i32 = -32000;

/// Error category for programmatic handling by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Resource not found (command, element)
    NotFound,
    /// Invalid input parameters
    InvalidInput,
    /// Resource busy or locked
    Busy,
    /// Internal server error
    Internal,
    /// External dependency failure (automation runtime)
    External,
    /// Operation timed out
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Busy => "busy",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(ErrorCategory::NotFound),
            "invalid_input" => Ok(ErrorCategory::InvalidInput),
            "busy" => Ok(ErrorCategory::Busy),
            "internal" => Ok(ErrorCategory::Internal),
            "external" => Ok(ErrorCategory::External),
            "timeout" => Ok(ErrorCategory::Timeout),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns whether an error code represents a retriable operation.
///
/// Only a busy session is transient: the same request may succeed once the
/// in-flight script for that session has finished.
pub fn is_retryable(code: i32) -> bool {
    matches!(code, SESSION_BUSY)
}

/// Returns the error category for a given error code.
pub fn category_for_code(code: i32) -> ErrorCategory {
    match code {
        METHOD_NOT_FOUND => ErrorCategory::NotFound,
        PARSE_ERROR | INVALID_REQUEST | INVALID_PARAMS | PAYLOAD_ERROR => {
            ErrorCategory::InvalidInput
        }
        SESSION_BUSY => ErrorCategory::Busy,
        SCRIPT_TIMEOUT => ErrorCategory::Timeout,
        RUNTIME_ERROR | MALFORMED_REPLY | SESSION_MISMATCH | EXECUTION_ERROR => {
            ErrorCategory::External
        }
        _ => ErrorCategory::Internal,
    }
}
