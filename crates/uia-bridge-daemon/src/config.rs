use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::lock_helpers::LOCK_TIMEOUT;

const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_REQUEST_BYTES: usize = 1_048_576; // 1MB

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a command waits for the session's in-flight script.
    pub lock_timeout: Duration,
    /// How long a single script may run in the runtime.
    pub script_timeout: Duration,
    /// Longest accepted request line.
    pub max_request_bytes: usize,
    /// Runtime program scripts are piped to.
    pub runtime: Option<PathBuf>,
    pub runtime_args: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self {
            lock_timeout: env_parse("UIA_BRIDGE_LOCK_TIMEOUT")
                .map(Duration::from_millis)
                .unwrap_or(LOCK_TIMEOUT),
            script_timeout: Duration::from_millis(
                env_parse("UIA_BRIDGE_SCRIPT_TIMEOUT").unwrap_or(DEFAULT_SCRIPT_TIMEOUT_MS),
            ),
            max_request_bytes: env_parse("UIA_BRIDGE_MAX_REQUEST")
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
            runtime: env::var_os("UIA_BRIDGE_RUNTIME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            runtime_args: env::var("UIA_BRIDGE_RUNTIME_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_max_request_bytes(mut self, max: usize) -> Self {
        self.max_request_bytes = max;
        self
    }

    pub fn with_runtime(mut self, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        self.runtime = Some(program.into());
        self.runtime_args = args;
        self
    }
}
