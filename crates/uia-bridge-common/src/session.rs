use std::fmt;
use std::ops::Deref;

use serde::Deserialize;
use serde::Serialize;

/// Error returned when SessionId validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdError {
    pub message: String,
}

impl fmt::Display for SessionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SessionIdError {}

/// Opaque name of an automation session.
///
/// Sessions are created outside the bridge; the id arrives with every request,
/// is embedded into generated scripts and must come back unchanged in the
/// runtime's reply.
///
/// # Invariants
/// - Session ID must not be empty
/// - Session ID must not be whitespace-only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a SessionId from an externally supplied string.
    ///
    /// # Errors
    /// Returns `SessionIdError` if the ID is empty or whitespace-only.
    pub fn try_new(id: impl Into<String>) -> Result<Self, SessionIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SessionIdError {
                message: "Session ID cannot be empty or whitespace-only".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Create a SessionId without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
