#![deny(clippy::all)]

mod adapters;
mod config;
mod executor;
mod lock_helpers;
mod metrics;
mod pipeline;
mod registry;
mod router;
mod transport;

#[cfg(test)]
mod test_support;

pub use adapters::command_error_response;
pub use config::BridgeConfig;
pub use executor::ExecutorError;
pub use executor::ProcessExecutor;
pub use executor::SESSION_ENV;
pub use executor::ScriptExecutor;
pub use lock_helpers::LOCK_TIMEOUT;
pub use lock_helpers::MAX_BACKOFF;
pub use lock_helpers::acquire_session_lock;
pub use metrics::BridgeMetrics;
pub use pipeline::CommandPipeline;
pub use registry::CommandRegistry;
pub use registry::RenderedCommand;
pub use router::Router;
pub use transport::TransportError;
pub use transport::serve_lines;
