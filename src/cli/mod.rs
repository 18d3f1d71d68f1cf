//! CLI module for Ultimarr.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Ultimarr - one MCP server for Jellyseerr, Sonarr and Radarr
///
/// Lets an AI assistant search, request and download media through the
/// services that already manage your library. Configuration is read from
/// JELLYSEERR_*, SONARR_* and RADARR_* environment variables.
#[derive(Parser, Debug)]
#[command(name = "ultimarr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve,

    /// Check that every upstream service is reachable
    Doctor,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration with API keys redacted
    Show,
}
