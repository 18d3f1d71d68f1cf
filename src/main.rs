//! Ultimarr CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ultimarr::cli::{commands, Cli, Commands};
use ultimarr::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("ultimarr={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let settings = Settings::from_env()?;

    // Execute command
    match &cli.command {
        None | Some(Commands::Serve) => {
            commands::run_serve(&settings).await?;
        }

        Some(Commands::Doctor) => {
            commands::run_doctor(&settings).await?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
