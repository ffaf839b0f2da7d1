//! CLI module for Study Bot
//!
//! Provides command-line interface parsing and handling for the studybot-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod commands;
pub mod init;
pub mod output;
pub mod repl;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Study Bot - AI study assistant
///
/// Answers academic questions with Gemini and remembers each student's
/// recent conversation.
#[derive(Parser, Debug)]
#[command(
    name = "studybot-server",
    version,
    about = "Study Bot - AI study assistant with conversation memory",
    long_about = "An AI study assistant that answers academic questions and remembers\n\
                  each student's recent conversation.\n\n\
                  Run without arguments to start the HTTP server, use 'chat' to talk to the\n\
                  assistant in the terminal, or 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  studybot-server init                   # Scaffold studybot.toml and .env.example\n    \
                  studybot-server                        # Start the server (requires studybot.toml)\n    \
                  studybot-server chat --user izza       # Terminal chat with memory\n    \
                  studybot-server chat --no-memory       # Terminal chat without memory\n    \
                  studybot-server history izza -l 10     # Show a student's last 10 turns\n    \
                  studybot-server models                 # List Gemini models for your key"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "studybot.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// History backend written into a scaffolded config
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitBackend {
    /// MongoDB, connection string in MONGODB_URI
    Mongodb,
    /// Local SQLite file under data/
    Sqlite,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server (default)
    Serve,

    /// Chat with the study assistant in the terminal
    Chat {
        /// Your name; asked interactively when omitted
        #[arg(short, long)]
        user: Option<String>,

        /// Do not read or store conversation history
        #[arg(long)]
        no_memory: bool,
    },

    /// Print a student's recent conversation
    History {
        /// User whose history is shown
        user: String,

        /// Number of most recent turns
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the Gemini models available to the configured API key
    Models,

    /// Initialize a new Study Bot project with configuration files
    ///
    /// Creates studybot.toml, .env.example, .gitignore and the data/ directory.
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// History backend to configure
        #[arg(long, value_enum, default_value = "mongodb")]
        backend: InitBackend,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Show the full configuration
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
