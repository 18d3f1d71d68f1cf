//! MCP (Model Context Protocol) server for Ultimarr.
//!
//! Exposes Jellyseerr, Sonarr and Radarr operations as tools.
//! Implements JSON-RPC 2.0 over stdio.

mod protocol;
mod registry;
mod server;
mod tools;

pub use protocol::{Tool, ToolCallResult};
pub use registry::{Arguments, ParamKind, ToolDescriptor, ToolRegistry};
pub use server::McpServer;
pub use tools::build_tool_registry;
