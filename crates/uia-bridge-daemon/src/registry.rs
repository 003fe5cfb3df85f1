//! Command name to handler lookup.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use uia_bridge_common::Payload;
use uia_bridge_common::SessionId;
use uia_bridge_core::CommandError;
use uia_bridge_core::CommandHandler;
use uia_bridge_core::Script;
use uia_bridge_core::builtin_handlers;

/// A command translated into the script that performs it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCommand {
    pub session: SessionId,
    pub command: String,
    pub script: Script,
}

#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        for handler in builtin_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Add a handler, replacing any handler already registered under its name.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        if self.handlers.insert(handler.name(), handler).is_some() {
            debug!("Replaced an existing command handler");
        }
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn translate(
        &self,
        session: &SessionId,
        command: &str,
        payload: &Payload,
    ) -> Result<RenderedCommand, CommandError> {
        let handler = self
            .handlers
            .get(command)
            .ok_or_else(|| CommandError::UnknownCommand {
                command: command.to_string(),
            })?;
        let script = handler.render(session, payload)?;
        Ok(RenderedCommand {
            session: session.clone(),
            command: handler.name().to_string(),
            script,
        })
    }
}
