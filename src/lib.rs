//! Ultimarr - one MCP server for Jellyseerr, Sonarr and Radarr
//!
//! Ultimarr lets an AI assistant discover, request and download media by
//! talking to the self-hosted services that already manage a library.
//!
//! # Overview
//!
//! Ultimarr exposes fifteen tools over MCP stdio:
//! - Search Jellyseerr and file movie or TV requests
//! - Browse the Sonarr series and Radarr movie libraries
//! - Trigger automatic searches, list candidate releases and grab one
//! - Inspect the download queues
//!
//! Every tool performs exactly one HTTP call and renders the response as
//! plain text.
//!
//! # Architecture
//!
//! - `config` - Environment-driven settings for the three services
//! - `upstream` - Shared HTTP client and per-service request building
//! - `services` - Typed adapters for Jellyseerr, Sonarr and Radarr
//! - `mcp` - Tool registry and the JSON-RPC stdio server
//! - `cli` - Command-line entry points
//!
//! # Example
//!
//! ```rust,no_run
//! use ultimarr::config::Settings;
//! use ultimarr::mcp::{build_tool_registry, McpServer};
//! use ultimarr::services::Services;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let services = Services::connect(&settings)?;
//!
//!     let server = McpServer::new(build_tool_registry(&services));
//!     server.run_stdio().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod services;
pub mod upstream;

#[cfg(test)]
mod test_support;

pub use error::{Result, UltimarrError};
