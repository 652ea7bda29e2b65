use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "serial-check")]
#[command(about = "Import serial ranges and verify product serials")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "serial-check.toml")]
    pub config: PathBuf,

    /// Override the database path from the config file
    #[arg(long)]
    pub database: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replace ranges and block-list from two CSV sheets, then check for collisions
    Import {
        /// Sheet with: row, reference, description, start serial, end serial, date
        #[arg(long)]
        ranges: PathBuf,

        /// Sheet with one column of invalid serials
        #[arg(long)]
        invalids: PathBuf,

        #[arg(long, help = "Log CPU and memory usage per phase")]
        monitor: bool,

        #[arg(long, help = "Delete both sheets after a successful import")]
        remove_after: bool,
    },

    /// Re-run the collision check over the active ranges
    DbCheck,

    /// Check one serial with the administrator credentials from [auth]
    Check {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        serial: String,
    },

    /// Check one serial for a remote system, printing JSON
    RemoteCheck {
        #[arg(long)]
        api_key: String,

        serial: String,
    },

    /// Handle an SMS gateway callback and text the answer back
    Callback {
        #[arg(long)]
        token: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        message: String,
    },

    /// Print the import and database-check logs and recent checks
    Logs {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}
