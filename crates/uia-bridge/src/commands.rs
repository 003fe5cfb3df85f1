use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

const LONG_ABOUT: &str = r#"uia-bridge turns WebDriver-style commands into scripts for a UI automation
runtime and turns the runtime's replies back into protocol responses.

ELEMENT REFERENCES:
    The runtime caches every element it returns under an opaque key. Key "0"
    is the session root and always exists. Pass keys from earlier replies as
    the "reference" field of later commands.

EXAMPLES:
    # Show the script for a search from the root
    uia-bridge render findElementRoot --session abc123 \
        --payload '{"depth": 2, "criteria": "type == '\''Button'\''"}'

    # List supported commands
    uia-bridge commands

    # Serve JSON-RPC on stdin/stdout, piping scripts to a runtime program
    uia-bridge serve --runtime ./device-runtime"#;

#[derive(Parser)]
#[command(name = "uia-bridge")]
#[command(author, version)]
#[command(about = "Translate WebDriver-style commands into UI automation scripts")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Runtime program settings shared by the commands that execute scripts.
#[derive(Debug, Clone, clap::Args)]
pub struct RuntimeArgs {
    /// Runtime program; receives the script on stdin and prints the reply
    #[arg(long, env = "UIA_BRIDGE_RUNTIME")]
    pub runtime: Option<PathBuf>,

    /// Argument passed to the runtime program (repeatable)
    #[arg(long = "runtime-arg", allow_hyphen_values = true)]
    pub runtime_args: Vec<String>,

    /// Milliseconds to wait for a session's in-flight script
    #[arg(long)]
    pub lock_timeout_ms: Option<u64>,

    /// Milliseconds a script may run before the runtime is killed
    #[arg(long)]
    pub script_timeout_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the script a command translates to, without running it
    Render {
        /// Command name, e.g. findElementRoot
        command: String,

        /// Session the script runs in
        #[arg(short, long)]
        session: String,

        /// Command payload as a JSON object ("-" reads it from stdin)
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },

    /// Translate a command, run it in the runtime and print the reply envelope
    Exec {
        command: String,

        #[arg(short, long)]
        session: String,

        #[arg(short, long, default_value = "{}")]
        payload: String,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// List the supported command names
    Commands,

    /// Serve newline-delimited JSON-RPC requests on stdin/stdout
    Serve {
        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Longest accepted request line in bytes
        #[arg(long)]
        max_request_bytes: Option<usize>,
    },
}
