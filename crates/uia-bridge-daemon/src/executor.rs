//! Running rendered scripts against the automation runtime.
//!
//! The runtime itself lives outside this crate. [`ScriptExecutor`] is the seam:
//! it receives a finished script and returns the runtime's raw reply text.

use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::warn;
use uia_bridge_common::SessionId;
use uia_bridge_core::Script;

/// Environment variable through which the runtime program learns the session.
pub const SESSION_ENV: &str = "UIA_BRIDGE_SESSION";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to launch runtime '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to runtime: {0}")]
    Io(#[from] std::io::Error),
    #[error("runtime exited with {status}: {detail}")]
    Failed { status: String, detail: String },
    #[error("runtime returned an empty reply")]
    EmptyReply,
    #[error("runtime did not reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("runtime is unavailable: {0}")]
    Unavailable(String),
}

impl ExecutorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::Timeout { .. })
    }
}

/// Delivers a script to the runtime that owns `session` and returns its reply.
///
/// Callers guarantee that at most one script per session is in flight.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, session: &SessionId, script: &Script) -> Result<String, ExecutorError>;
}

/// Runs one runtime process per script: the script goes to its stdin and the
/// reply envelope is read from its stdout.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn spawn(&self, session: &SessionId) -> Result<Child, ExecutorError> {
        Command::new(&self.program)
            .args(&self.args)
            .env(SESSION_ENV, session.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }

    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, ExecutorError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    warn!(error = %e, "Failed to kill timed-out runtime process");
                }
                if let Err(e) = child.wait() {
                    warn!(error = %e, "Failed to reap timed-out runtime process");
                }
                return Err(ExecutorError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
    stream: &'static str,
) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut out = String::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_string(&mut out) {
                debug!(error = %e, stream, "Stopped reading runtime output");
            }
        }
        out
    })
}

/// Writes the script on its own thread so the deadline in `wait` also covers
/// a runtime that never reads its stdin. The handle is never joined: a
/// grandchild holding the pipe open may keep the write blocked after a kill.
fn feed<W: Write + Send + 'static>(pipe: Option<W>, script: String) {
    let Some(mut pipe) = pipe else {
        return;
    };
    thread::spawn(move || {
        if let Err(e) = pipe.write_all(script.as_bytes()) {
            // The runtime may exit before reading everything; its exit
            // status and output decide the outcome.
            debug!(error = %e, "Runtime closed stdin early");
        }
    });
}

fn collect(
    reader: thread::JoinHandle<String>,
    stream: &'static str,
) -> Result<String, ExecutorError> {
    reader.join().map_err(|_| {
        error!(stream, "Runtime output reader panicked");
        ExecutorError::Io(std::io::Error::other(format!(
            "reader for runtime {} panicked",
            stream
        )))
    })
}

impl ScriptExecutor for ProcessExecutor {
    fn execute(&self, session: &SessionId, script: &Script) -> Result<String, ExecutorError> {
        let mut child = self.spawn(session)?;
        let stdout = drain(child.stdout.take(), "stdout");
        let stderr = drain(child.stderr.take(), "stderr");
        feed(child.stdin.take(), script.as_str().to_string());

        let status = self.wait(&mut child)?;
        let stdout = collect(stdout, "stdout")?;
        let stderr = collect(stderr, "stderr")?;

        if !status.success() {
            let detail = match (stderr.trim(), stdout.trim()) {
                ("", "") => "no output".to_string(),
                ("", out) => out.to_string(),
                (err, _) => err.to_string(),
            };
            return Err(ExecutorError::Failed {
                status: status.to_string(),
                detail,
            });
        }

        let reply = stdout.trim();
        if reply.is_empty() {
            return Err(ExecutorError::EmptyReply);
        }
        debug!(session = %session, bytes = reply.len(), "Runtime replied");
        Ok(reply.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use uia_bridge_common::Payload;
    use uia_bridge_core::CommandHandler;
    use uia_bridge_core::handlers::Click;
    use uia_bridge_core::handlers::SetValue;

    fn click_script() -> Script {
        let payload = Payload::new(serde_json::json!({"reference": "1"})).unwrap();
        Click.render(&SessionId::new("s1"), &payload).unwrap()
    }

    fn sh(script: &str) -> ProcessExecutor {
        ProcessExecutor::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_reply_is_read_from_stdout() {
        let executor = sh(r#"cat >/dev/null; echo '{"sessionId":"s1","status":0,"value":null}'"#);
        let reply = executor
            .execute(&SessionId::new("s1"), &click_script())
            .unwrap();
        assert_eq!(reply, r#"{"sessionId":"s1","status":0,"value":null}"#);
    }

    #[test]
    fn test_script_is_written_to_stdin() {
        let executor = sh("cat");
        let script = click_script();
        let reply = executor.execute(&SessionId::new("s1"), &script).unwrap();
        assert_eq!(reply, script.as_str());
    }

    #[test]
    fn test_session_is_exported() {
        let executor = sh(&format!("cat >/dev/null; printf %s \"${}\"", SESSION_ENV));
        let reply = executor
            .execute(&SessionId::new("abc123"), &click_script())
            .unwrap();
        assert_eq!(reply, "abc123");
    }

    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let executor = sh("cat >/dev/null; echo boom >&2; exit 3");
        let err = executor
            .execute(&SessionId::new("s1"), &click_script())
            .unwrap_err();
        match err {
            ExecutorError::Failed { detail, .. } => assert_eq!(detail, "boom"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_reply() {
        let executor = sh("cat >/dev/null");
        let err = executor
            .execute(&SessionId::new("s1"), &click_script())
            .unwrap_err();
        assert!(matches!(err, ExecutorError::EmptyReply));
    }

    #[test]
    fn test_timeout_kills_runtime() {
        let executor = ProcessExecutor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(50),
        );
        let err = executor
            .execute(&SessionId::new("s1"), &click_script())
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_timeout_covers_script_the_runtime_never_reads() {
        let text = "x".repeat(512 * 1024);
        let payload = Payload::new(serde_json::json!({"reference": "1", "value": text})).unwrap();
        let script = SetValue.render(&SessionId::new("s1"), &payload).unwrap();
        let executor = ProcessExecutor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let err = executor
            .execute(&SessionId::new("s1"), &script)
            .unwrap_err();
        assert!(err.is_timeout(), "expected Timeout, got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_large_script_reaches_reading_runtime() {
        let text = "y".repeat(256 * 1024);
        let payload = Payload::new(serde_json::json!({"reference": "1", "value": text})).unwrap();
        let script = SetValue.render(&SessionId::new("s1"), &payload).unwrap();
        let reply = sh("wc -c").execute(&SessionId::new("s1"), &script).unwrap();
        assert_eq!(reply.trim().parse::<usize>().unwrap(), script.as_str().len());
    }

    #[test]
    fn test_panicked_reader_is_an_error_not_an_empty_reply() {
        let reader = thread::spawn(|| -> String { panic!("reader failed") });
        let err = collect(reader, "stdout").unwrap_err();
        assert!(matches!(err, ExecutorError::Io(_)));
        assert!(err.to_string().contains("stdout"));
    }

    #[test]
    fn test_missing_program() {
        let executor = ProcessExecutor::new(
            "/nonexistent/uia-runtime",
            Vec::new(),
            Duration::from_secs(1),
        );
        let err = executor
            .execute(&SessionId::new("s1"), &click_script())
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Spawn { .. }));
    }
}
