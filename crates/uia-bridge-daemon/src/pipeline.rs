//! Translate, execute and interpret one command.
//!
//! Each session runs at most one script at a time: the runtime's element
//! cache is per session and scripts mutate it. Different sessions execute in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use tracing::warn;
use uia_bridge_common::Payload;
use uia_bridge_common::SessionId;
use uia_bridge_common::mutex_lock_or_recover;
use uia_bridge_core::CommandError;
use uia_bridge_core::ResponseEnvelope;

use crate::executor::ExecutorError;
use crate::executor::ScriptExecutor;
use crate::lock_helpers::acquire_session_lock;
use crate::metrics::BridgeMetrics;
use crate::registry::CommandRegistry;
use crate::registry::RenderedCommand;

pub struct CommandPipeline<E: ScriptExecutor> {
    registry: CommandRegistry,
    executor: E,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl<E: ScriptExecutor> CommandPipeline<E> {
    pub fn new(registry: CommandRegistry, executor: E, lock_timeout: Duration) -> Self {
        Self {
            registry,
            executor,
            sessions: Mutex::new(HashMap::new()),
            lock_timeout,
            metrics: Arc::new(BridgeMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<BridgeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// Render the command's script without running it.
    pub fn translate(
        &self,
        session: &SessionId,
        command: &str,
        payload: &Payload,
    ) -> Result<RenderedCommand, CommandError> {
        self.registry
            .translate(session, command, payload)
            .inspect_err(|e| {
                if e.is_translation() {
                    self.metrics.record_translation_error();
                }
            })
    }

    /// Run a command end to end. `Ok` carries the runtime's `value`; a
    /// non-zero runtime status is [`CommandError::Runtime`].
    pub fn execute(
        &self,
        session: &SessionId,
        command: &str,
        payload: &Payload,
    ) -> Result<Value, CommandError> {
        let rendered = self.translate(session, command, payload)?;
        self.run(&rendered)
    }

    pub fn run(&self, rendered: &RenderedCommand) -> Result<Value, CommandError> {
        let session = &rendered.session;
        let raw = self.run_locked(rendered)?;

        let envelope = ResponseEnvelope::parse(&raw).inspect_err(|e| {
            self.metrics.record_execution_error();
            warn!(session = %session, error = %e, "Runtime reply is not an envelope");
        })?;

        if let Some(replied) = envelope.session_id.as_deref() {
            if replied != session.as_str() {
                self.metrics.record_execution_error();
                warn!(session = %session, replied, "Runtime replied for another session");
                return Err(CommandError::SessionMismatch {
                    expected: session.to_string(),
                    actual: replied.to_string(),
                });
            }
        }

        envelope.into_result().inspect_err(|e| {
            self.metrics.record_runtime_error();
            warn!(
                session = %session,
                command = %rendered.command,
                error = %e,
                "Runtime reported failure"
            );
        })
    }

    fn run_locked(&self, rendered: &RenderedCommand) -> Result<String, CommandError> {
        let session = &rendered.session;
        let lock = self.session_lock(session);
        let Some(_guard) = acquire_session_lock(&lock, self.lock_timeout) else {
            self.metrics.record_lock_timeout();
            warn!(session = %session, "Timed out waiting for in-flight script");
            return Err(CommandError::SessionBusy {
                session_id: session.to_string(),
            });
        };

        debug!(session = %session, command = %rendered.command, "Executing script");
        self.executor
            .execute(session, &rendered.script)
            .map_err(|e| {
                self.metrics.record_execution_error();
                warn!(session = %session, error = %e, "Script execution failed");
                match e {
                    ExecutorError::Timeout { timeout_ms } => CommandError::ScriptTimeout {
                        session_id: session.to_string(),
                        timeout_ms,
                    },
                    other => CommandError::Execution {
                        reason: other.to_string(),
                    },
                }
            })
    }

    fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        let mut sessions = mutex_lock_or_recover(&self.sessions);
        if let Some(lock) = sessions.get(session) {
            return Arc::clone(lock);
        }
        // Locks nobody is waiting on belong to finished commands.
        sessions.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(sessions.entry(session.clone()).or_default())
    }

    /// Sessions with a command currently waiting or executing.
    pub fn active_sessions(&self) -> usize {
        mutex_lock_or_recover(&self.sessions)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockExecutor;
    use serde_json::json;
    use std::thread;
    use uia_bridge_core::Stage;

    fn pipeline(executor: MockExecutor) -> CommandPipeline<MockExecutor> {
        CommandPipeline::new(
            CommandRegistry::with_builtin_commands(),
            executor,
            Duration::from_millis(50),
        )
    }

    fn find_payload() -> Payload {
        Payload::new(json!({"depth": 2, "criteria": "type == 'Button'"})).unwrap()
    }

    #[test]
    fn test_success_returns_value() {
        let p = pipeline(MockExecutor::new().reply_success("abc123", json!({"ELEMENT": "7"})));
        let value = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap();
        assert_eq!(value, json!({"ELEMENT": "7"}));

        let received = p.executor().received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "abc123");
        assert!(received[0].1.starts_with("var root = UIAutomation.cache.get('0');"));
    }

    #[test]
    fn test_runtime_failure_is_runtime_error() {
        let p = pipeline(MockExecutor::new().reply_status("abc123", 7, json!("no match")));
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.stage(), Stage::Runtime);
        assert_eq!(p.metrics().runtime_errors(), 1);
    }

    #[test]
    fn test_translation_failure_never_reaches_runtime() {
        let p = pipeline(MockExecutor::new());
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &Payload::empty())
            .unwrap_err();
        assert!(err.is_translation());
        assert!(p.executor().received().is_empty());
        assert_eq!(p.metrics().translation_errors(), 1);
    }

    #[test]
    fn test_unknown_command_is_not_a_translation_error() {
        let p = pipeline(MockExecutor::new());
        let err = p
            .execute(&SessionId::new("s"), "shake", &Payload::empty())
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Dispatch);
        assert_eq!(p.metrics().translation_errors(), 0);
    }

    #[test]
    fn test_session_mismatch() {
        let p = pipeline(MockExecutor::new().reply_success("other", json!(null)));
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::SessionMismatch {
                expected: "abc123".into(),
                actual: "other".into()
            }
        );
    }

    #[test]
    fn test_reply_without_session_is_accepted() {
        let p = pipeline(MockExecutor::new().reply_raw(r#"{"status":0,"value":3}"#));
        let value = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_malformed_reply() {
        let p = pipeline(MockExecutor::new().reply_raw("Segmentation fault"));
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert!(matches!(err, CommandError::MalformedReply(_)));
    }

    #[test]
    fn test_executor_failure_is_execution_error() {
        let p = pipeline(
            MockExecutor::new().reply_error(ExecutorError::Unavailable("device gone".into())),
        );
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert!(matches!(err, CommandError::Execution { ref reason } if reason.contains("device gone")));
        assert_eq!(p.metrics().execution_errors(), 1);
    }

    #[test]
    fn test_executor_timeout_is_script_timeout() {
        let p = pipeline(MockExecutor::new().reply_error(ExecutorError::Timeout { timeout_ms: 10 }));
        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::ScriptTimeout {
                session_id: "abc123".into(),
                timeout_ms: 10
            }
        );
    }

    #[test]
    fn test_second_command_in_same_session_is_busy() {
        let executor = MockExecutor::new()
            .with_delay(Duration::from_millis(300))
            .reply_success("abc123", json!(1))
            .reply_success("abc123", json!(2));
        let p = Arc::new(pipeline(executor));

        let first = {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                p.execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            })
        };
        while p.executor().received().is_empty() {
            thread::sleep(Duration::from_millis(1));
        }

        let err = p
            .execute(&SessionId::new("abc123"), "findElementRoot", &find_payload())
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::SessionBusy {
                session_id: "abc123".into()
            }
        );
        assert!(err.is_retryable());
        assert_eq!(p.metrics().lock_timeouts(), 1);
        assert_eq!(first.join().unwrap().unwrap(), json!(1));
    }

    #[test]
    fn test_sessions_run_in_parallel() {
        let executor = MockExecutor::new()
            .with_delay(Duration::from_millis(100))
            .reply_raw(r#"{"status":0,"value":1}"#)
            .reply_raw(r#"{"status":0,"value":2}"#);
        let p = Arc::new(CommandPipeline::new(
            CommandRegistry::with_builtin_commands(),
            executor,
            Duration::from_millis(10),
        ));

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|sid| {
                let p = Arc::clone(&p);
                thread::spawn(move || p.execute(&SessionId::new(sid), "tree", &Payload::empty()))
            })
            .collect();

        // The lock timeout is far shorter than the executor delay, so neither
        // command could have waited for the other.
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(p.metrics().lock_timeouts(), 0);
    }

    #[test]
    fn test_finished_sessions_release_their_locks() {
        let p = pipeline(MockExecutor::new().reply_success("s", json!(null)));
        p.execute(&SessionId::new("s"), "tree", &Payload::empty())
            .unwrap();
        assert_eq!(p.active_sessions(), 0);
    }
}
