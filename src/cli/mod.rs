//! CLI module for the admissions server
//!
//! Provides command-line interface parsing and handling for the admissions-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod user;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Admissions Server
///
/// Staff authentication, CSV table uploads and offer status reconciliation
/// for an admissions office.
#[derive(Parser, Debug)]
#[command(
    name = "admissions-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Admissions back office server",
    long_about = "Serves the admissions dashboard API: staff accounts, CSV uploads of\n\
                  applicant, offer and fee tables, and automatic offer status reconciliation.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a config.",
    after_help = "EXAMPLES:\n    \
                  admissions-server init                      # Write admissions.toml and .env.example\n    \
                  admissions-server                           # Start the server\n    \
                  admissions-server config --validate         # Check the config file\n    \
                  admissions-server user create --email a@b.edu --name Asha --role admin"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "admissions.toml", global = true)]
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

/// Mail backend written by `init`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailChoice {
    /// Log reset mails instead of sending them
    Log,
    /// Send through SendGrid (needs SENDGRID_API_KEY)
    Sendgrid,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter admissions.toml, .env.example and data directory
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Mail backend for password reset links
        #[arg(long, value_enum, default_value = "log")]
        mail: MailChoice,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Manage staff accounts
    #[command(subcommand)]
    User(UserCommands),
}

/// Staff account subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a staff account
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        contact: String,

        /// Campus (must be listed in auth.allowed_campuses)
        #[arg(long, default_value = "Pilani")]
        campus: String,

        /// admin, view or view_and_withdraw
        #[arg(long, default_value = "view")]
        role: String,

        /// Initial password
        #[arg(long, env = "ADMISSIONS_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List staff accounts
    List,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
