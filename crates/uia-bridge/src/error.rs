use thiserror::Error;
use uia_bridge_core::CommandError;
use uia_bridge_daemon::TransportError;
use uia_bridge_ipc::error_codes::ErrorCategory;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("payload is not valid JSON")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("no runtime program configured")]
    MissingRuntime,
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CliError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CliError::Command(e) => e.category(),
            CliError::InvalidPayload(_) | CliError::MissingRuntime => ErrorCategory::InvalidInput,
            CliError::Io(_) | CliError::Transport(_) => ErrorCategory::External,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Command(e) => Some(e.suggestion()),
            CliError::InvalidPayload(_) => {
                Some("Pass the payload as a JSON object, e.g. '{\"reference\": \"3\"}'.".to_string())
            }
            CliError::MissingRuntime => {
                Some("Pass --runtime <PATH> or set UIA_BRIDGE_RUNTIME.".to_string())
            }
            CliError::Io(_) | CliError::Transport(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CliError::Command(e) if e.is_retryable())
    }

    /// Process exit status, following sysexits.h by error category.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::InvalidInput => 64, // EX_USAGE
            ErrorCategory::NotFound => 69,     // EX_UNAVAILABLE
            ErrorCategory::Busy => 73,         // EX_CANTCREAT
            ErrorCategory::External => 74,     // EX_IOERR
            ErrorCategory::Internal => 74,     // EX_IOERR
            ErrorCategory::Timeout => 75,      // EX_TEMPFAIL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_category() {
        let unknown = CliError::from(CommandError::UnknownCommand {
            command: "x".into(),
        });
        assert_eq!(unknown.exit_code(), 69);

        let busy = CliError::from(CommandError::SessionBusy {
            session_id: "s".into(),
        });
        assert_eq!(busy.exit_code(), 73);
        assert!(busy.is_retryable());

        assert_eq!(CliError::MissingRuntime.exit_code(), 64);
    }

    #[test]
    fn test_invalid_payload_message() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cli = CliError::InvalidPayload(err);
        assert!(cli.to_string().starts_with("payload is not valid JSON"));
        assert_eq!(cli.exit_code(), 64);
    }
}
