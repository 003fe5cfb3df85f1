use std::io::Read;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use uia_bridge_common::Payload;
use uia_bridge_common::SessionId;
use uia_bridge_core::CommandError;
use uia_bridge_core::ResponseEnvelope;
use uia_bridge_core::TranslationError;
use uia_bridge_daemon::BridgeConfig;
use uia_bridge_daemon::CommandPipeline;
use uia_bridge_daemon::CommandRegistry;
use uia_bridge_daemon::ProcessExecutor;
use uia_bridge_daemon::Router;
use uia_bridge_daemon::serve_lines;

use crate::commands::Cli;
use crate::commands::Commands;
use crate::commands::OutputFormat;
use crate::commands::RuntimeArgs;
use crate::error::CliError;
use crate::telemetry;

const PROGRAM_NAME: &str = "uia-bridge";

pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
}

#[derive(Debug, Default)]
pub struct Application;

impl Application {
    pub fn new() -> Self {
        Self
    }

    /// Run the CLI and return the process exit status.
    pub fn run(&self) -> Result<i32> {
        let cli = Cli::parse();
        let _telemetry = telemetry::init_tracing(if cli.verbose { "debug" } else { "warn" });
        let format = cli.format;
        debug!(command = ?cli.command, format = ?format, "CLI command parsed");

        let exit_code = match run(cli).context("command failed") {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => handle_error(&e, format),
        };
        Ok(exit_code)
    }
}

fn handle_error(e: &anyhow::Error, format: OutputFormat) -> i32 {
    match find_error::<CliError>(e) {
        Some(cli_error) => {
            print_cli_error(cli_error, format);
            cli_error.exit_code()
        }
        None => {
            eprintln!("{}: Error: {:#}", PROGRAM_NAME, e);
            exit_codes::GENERAL_ERROR
        }
    }
}

fn find_error<T: std::error::Error + 'static>(error: &anyhow::Error) -> Option<&T> {
    error.chain().find_map(|source| source.downcast_ref::<T>())
}

fn causes(error: &CliError) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

fn print_cli_error(error: &CliError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput<'a> {
                success: bool,
                error: String,
                #[serde(skip_serializing_if = "Vec::is_empty")]
                causes: Vec<String>,
                category: &'a str,
                #[serde(skip_serializing_if = "Option::is_none")]
                suggestion: Option<String>,
                retryable: bool,
            }
            let output = ErrorOutput {
                success: false,
                error: error.to_string(),
                causes: causes(error),
                category: error.category().as_str(),
                suggestion: error.suggestion(),
                retryable: error.is_retryable(),
            };
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            eprintln!("{}: Error: {}", PROGRAM_NAME, error);
            for cause in causes(error) {
                eprintln!("  Caused by: {}", cause);
            }
            if let Some(suggestion) = error.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            if error.is_retryable() {
                eprintln!("(This error may be transient - retry may succeed)");
            }
        }
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let format = cli.format;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Render {
            command,
            session,
            payload,
        } => {
            let payload = read_payload(&command, &payload)?;
            let registry = CommandRegistry::with_builtin_commands();
            let rendered = registry.translate(&SessionId::new(session), &command, &payload)?;
            match format {
                OutputFormat::Text => writeln!(out, "{}", rendered.script)?,
                OutputFormat::Json => writeln!(out, "{}", to_json(&rendered)?)?,
            }
        }

        Commands::Exec {
            command,
            session,
            payload,
            runtime,
        } => {
            let payload = read_payload(&command, &payload)?;
            let config = config_from(&runtime, BridgeConfig::from_env());
            let pipeline = pipeline_from(&config)?;
            let session = SessionId::new(session);
            let value = pipeline.execute(&session, &command, &payload)?;
            match format {
                OutputFormat::Text => writeln!(out, "{}", to_pretty_json(&value)?)?,
                OutputFormat::Json => {
                    let envelope = ResponseEnvelope::success(session.as_str(), value);
                    writeln!(out, "{}", to_json(&envelope.to_json())?)?
                }
            }
        }

        Commands::Commands => {
            let registry = CommandRegistry::with_builtin_commands();
            match format {
                OutputFormat::Text => {
                    for name in registry.names() {
                        writeln!(out, "{}", name)?;
                    }
                }
                OutputFormat::Json => {
                    writeln!(out, "{}", json!({ "commands": registry.names() }))?
                }
            }
        }

        Commands::Serve {
            runtime,
            max_request_bytes,
        } => {
            let mut config = config_from(&runtime, BridgeConfig::from_env());
            if let Some(max) = max_request_bytes {
                config = config.with_max_request_bytes(max);
            }
            let pipeline = pipeline_from(&config)?;
            let router = Router::new(&pipeline);
            info!(
                lock_timeout_ms = config.lock_timeout.as_millis() as u64,
                max_request_bytes = config.max_request_bytes,
                "Serving JSON-RPC on stdin"
            );
            serve_lines(
                std::io::stdin().lock(),
                out,
                &router,
                config.max_request_bytes,
            )?;
        }
    }
    Ok(())
}

/// Parse the `--payload` argument; `-` reads it from stdin.
fn read_payload(command: &str, raw: &str) -> Result<Payload, CliError> {
    let text = if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        raw.to_string()
    };
    let value: Value = serde_json::from_str(&text).map_err(CliError::InvalidPayload)?;
    Payload::new(value)
        .map_err(|e| CliError::Command(CommandError::from(TranslationError::new(command, e))))
}

fn config_from(args: &RuntimeArgs, mut config: BridgeConfig) -> BridgeConfig {
    if let Some(program) = &args.runtime {
        let runtime_args = if args.runtime_args.is_empty() {
            config.runtime_args.clone()
        } else {
            args.runtime_args.clone()
        };
        config = config.with_runtime(program.clone(), runtime_args);
    } else if !args.runtime_args.is_empty() {
        config.runtime_args = args.runtime_args.clone();
    }
    if let Some(ms) = args.lock_timeout_ms {
        config = config.with_lock_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.script_timeout_ms {
        config = config.with_script_timeout(Duration::from_millis(ms));
    }
    config
}

fn pipeline_from(config: &BridgeConfig) -> Result<CommandPipeline<ProcessExecutor>, CliError> {
    let program = config.runtime.clone().ok_or(CliError::MissingRuntime)?;
    let executor = ProcessExecutor::new(
        program,
        config.runtime_args.clone(),
        config.script_timeout,
    );
    Ok(CommandPipeline::new(
        CommandRegistry::with_builtin_commands(),
        executor,
        config.lock_timeout,
    ))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string(value).map_err(|e| CliError::Io(std::io::Error::other(e)))
}

fn to_pretty_json(value: &Value) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Io(std::io::Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn runtime_args() -> RuntimeArgs {
        RuntimeArgs {
            runtime: None,
            runtime_args: Vec::new(),
            lock_timeout_ms: None,
            script_timeout_ms: None,
        }
    }

    fn base_config() -> BridgeConfig {
        let mut config = BridgeConfig::from_env();
        config.runtime = None;
        config.runtime_args = Vec::new();
        config
    }

    #[test]
    fn test_cli_flags_override_config() {
        let mut args = runtime_args();
        args.runtime = Some(PathBuf::from("/opt/runtime"));
        args.runtime_args = vec!["--sim".into()];
        args.lock_timeout_ms = Some(10);
        args.script_timeout_ms = Some(20);

        let config = config_from(&args, base_config());
        assert_eq!(config.runtime, Some(PathBuf::from("/opt/runtime")));
        assert_eq!(config.runtime_args, vec!["--sim"]);
        assert_eq!(config.lock_timeout, Duration::from_millis(10));
        assert_eq!(config.script_timeout, Duration::from_millis(20));
    }

    #[test]
    fn test_missing_runtime() {
        let config = config_from(&runtime_args(), base_config());
        assert!(matches!(
            pipeline_from(&config),
            Err(CliError::MissingRuntime)
        ));
    }

    #[test]
    fn test_payload_must_be_object() {
        let err = read_payload("click", "[1]").unwrap_err();
        match err {
            CliError::Command(e) => assert!(e.is_translation()),
            other => panic!("expected command error, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_must_be_json() {
        assert!(matches!(
            read_payload("click", "{"),
            Err(CliError::InvalidPayload(_))
        ));
    }
}
