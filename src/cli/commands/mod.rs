//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod index;
mod init;
mod serve;
mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "corporatica")]
#[command(about = "Image, tabular and text analysis API server")]
#[command(version)]
pub struct Cli {
    /// Target data directory (overrides config file).
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the HTTP API server
    Serve {
        /// Address to bind: "8000", "0.0.0.0" or "0.0.0.0:8000"
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        bind: String,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Work with the persistent search index
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account
    Create {
        /// Username (stored lower-case)
        username: String,
        /// Password; prefer the environment variable over the flag
        #[arg(long, env = "CORPORATICA_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Append a document to the index
    Add {
        /// Document text
        text: String,
    },
    /// Query the index
    Search {
        /// Query string (supports AND, OR, NOT, quotes and parentheses)
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        target: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::User { command } => match command {
            UserCommands::Create { username, password } => {
                user::cmd_user_create(&settings, &username, &password).await
            }
        },
        Commands::Index { command } => match command {
            IndexCommands::Add { text } => index::cmd_index_add(&settings, &text).await,
            IndexCommands::Search { query, limit } => {
                index::cmd_index_search(&settings, &query, limit).await
            }
        },
    }
}
