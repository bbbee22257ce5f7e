//! CLI for the buffet-server binary
//!
//! Uses clap for argument parsing and owo-colors for colored terminal
//! output. Running without a subcommand starts the HTTP server; `chat`
//! opens an interactive REPL against the same agent pipeline, and `init`
//! scaffolds a new project.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mr Buffet - personal finance assistant server
#[derive(Parser, Debug)]
#[command(
    name = "buffet-server",
    version,
    about = "Mr Buffet - personal finance assistant server",
    long_about = "An LLM-backed personal finance assistant that tracks categories and\n\
                  transactions through tool calls.\n\n\
                  Run without arguments to start the HTTP server, use 'chat' for an\n\
                  interactive terminal session, or 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  buffet-server init                     # Scaffold a new project\n    \
                  buffet-server                          # Start the server (requires buffet.toml)\n    \
                  buffet-server chat --user-id 1 --user-name Alice\n    \
                  buffet-server --config my.toml         # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "buffet.toml", global = true)]
    pub config: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new project with a configuration file and database
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Chat with the assistant from the terminal
    Chat {
        /// User id the conversation is scoped to
        #[arg(long)]
        user_id: String,

        /// Display name used in the system prompt
        #[arg(long)]
        user_name: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
