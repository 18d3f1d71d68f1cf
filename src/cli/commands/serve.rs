//! Serve command implementation.

use crate::config::Settings;
use crate::mcp::{build_tool_registry, McpServer};
use crate::services::{Services, Upstream};
use anyhow::Result;
use tracing::info;

/// Run the MCP server on stdin/stdout until the client disconnects.
pub async fn run_serve(settings: &Settings) -> Result<()> {
    let services = Services::connect(settings)?;
    for upstream in services.upstreams() {
        info!(service = %upstream.service(), url = upstream.base_url(), "Upstream configured");
    }

    let server = McpServer::new(build_tool_registry(&services));
    server.run_stdio().await?;
    Ok(())
}
