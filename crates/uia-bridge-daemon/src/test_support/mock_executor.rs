//! Scripted stand-in for the automation runtime.
//!
//! Replies are queued up front and handed out in order; every script the
//! executor receives is recorded for inspection.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use uia_bridge_common::SessionId;
use uia_bridge_common::mutex_lock_or_recover;
use uia_bridge_core::ResponseEnvelope;
use uia_bridge_core::Script;

use crate::executor::ExecutorError;
use crate::executor::ScriptExecutor;

pub enum MockReply {
    Raw(String),
    Error(ExecutorError),
}

#[derive(Default)]
pub struct MockExecutor {
    replies: Mutex<VecDeque<MockReply>>,
    received: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every `execute` call, to hold the session lock.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply_raw(self, raw: impl Into<String>) -> Self {
        mutex_lock_or_recover(&self.replies).push_back(MockReply::Raw(raw.into()));
        self
    }

    pub fn reply_success(self, session: &str, value: Value) -> Self {
        self.reply_raw(ResponseEnvelope::success(session, value).to_json().to_string())
    }

    pub fn reply_status(self, session: &str, status: i64, value: Value) -> Self {
        self.reply_raw(
            ResponseEnvelope::failure(session, status, value)
                .to_json()
                .to_string(),
        )
    }

    pub fn reply_error(self, error: ExecutorError) -> Self {
        mutex_lock_or_recover(&self.replies).push_back(MockReply::Error(error));
        self
    }

    /// Scripts received so far as `(session, script)` pairs.
    pub fn received(&self) -> Vec<(String, String)> {
        mutex_lock_or_recover(&self.received).clone()
    }
}

impl ScriptExecutor for MockExecutor {
    fn execute(&self, session: &SessionId, script: &Script) -> Result<String, ExecutorError> {
        mutex_lock_or_recover(&self.received)
            .push((session.as_str().to_string(), script.as_str().to_string()));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match mutex_lock_or_recover(&self.replies).pop_front() {
            Some(MockReply::Raw(raw)) => Ok(raw),
            Some(MockReply::Error(e)) => Err(e),
            None => Err(ExecutorError::Unavailable("no reply queued".to_string())),
        }
    }
}
