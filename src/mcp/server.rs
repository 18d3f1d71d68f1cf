//! MCP server implementation.
//!
//! Requests are read line by line. `tools/call` runs on its own task so a slow
//! upstream never blocks other calls; responses are written as tasks finish.

use super::protocol::*;
use super::registry::ToolRegistry;
use crate::error::Result;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
// 2025-03-26 is skipped: it requires JSON-RPC batch support.
const SUPPORTED_VERSIONS: [&str; 2] = ["2024-11-05", "2025-06-18"];
const SERVER_NAME: &str = "ultimarr";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A finished tool call: the in-flight key and the response to write.
type Completed = (String, JsonRpcResponse);

/// MCP Server for Ultimarr.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Run the MCP server on stdin/stdout.
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC from `reader` until EOF.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.registry.len(), "Ultimarr MCP server starting");

        let mut lines = reader.lines();
        let mut tasks: JoinSet<Completed> = JoinSet::new();
        let mut in_flight: HashMap<String, AbortHandle> = HashMap::new();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if let Some(response) = self.handle_line(&line, &mut tasks, &mut in_flight) {
                        write_response(&mut writer, &response).await?;
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Some(response) = completed(joined, &mut in_flight) {
                        write_response(&mut writer, &response).await?;
                    }
                }
            }
        }

        debug!(pending = tasks.len(), "Input closed, draining tool calls");
        while let Some(joined) = tasks.join_next().await {
            if let Some(response) = completed(joined, &mut in_flight) {
                write_response(&mut writer, &response).await?;
            }
        }

        info!("Ultimarr MCP server stopped");
        Ok(())
    }

    /// Handle one input line, returning a response to write immediately.
    fn handle_line(
        &self,
        line: &str,
        tasks: &mut JoinSet<Completed>,
        in_flight: &mut HashMap<String, AbortHandle>,
    ) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to parse request");
                return Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"));
            }
        };
        let id = value.get("id").filter(|id| !id.is_null()).cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "Invalid request");
                return Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    &format!("Invalid request: {}", e),
                ));
            }
        };

        let Some(id) = request.id else {
            self.handle_notification(&request.method, request.params, in_flight);
            return None;
        };

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id, request.params)),
            "ping" => Some(JsonRpcResponse::success(Some(id), json!({}))),
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => self.handle_tools_call(id, request.params, tasks, in_flight),
            other => Some(JsonRpcResponse::error(
                Some(id),
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", other),
            )),
        }
    }

    fn handle_notification(
        &self,
        method: &str,
        params: Option<Value>,
        in_flight: &mut HashMap<String, AbortHandle>,
    ) {
        if method != "notifications/cancelled" {
            debug!(method, "Notification received");
            return;
        }

        let cancelled: CancelledParams = match params.map(serde_json::from_value) {
            Some(Ok(cancelled)) => cancelled,
            _ => {
                warn!("Ignoring malformed cancellation");
                return;
            }
        };

        let key = cancelled.request_id.to_string();
        match in_flight.remove(&key) {
            Some(handle) => {
                info!(request = %key, reason = ?cancelled.reason, "Cancelling tool call");
                handle.abort();
            }
            None => debug!(request = %key, "Cancellation for unknown request"),
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = params
            .protocol_version
            .filter(|v| SUPPORTED_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| PROTOCOL_VERSION.to_string());
        info!(protocol_version = %protocol_version, "Client initialized");

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };
        success(id, &result)
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.registry.list_tools(),
        };
        success(id, &result)
    }

    /// Validate a tools/call request and spawn it. Only errors respond here.
    fn handle_tools_call(
        &self,
        id: Value,
        params: Option<Value>,
        tasks: &mut JoinSet<Completed>,
        in_flight: &mut HashMap<String, AbortHandle>,
    ) -> Option<JsonRpcResponse> {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Some(JsonRpcResponse::error(
                    Some(id),
                    INVALID_PARAMS,
                    &format!("Invalid params: {}", e),
                ))
            }
            None => {
                return Some(JsonRpcResponse::error(Some(id), INVALID_PARAMS, "Missing params"))
            }
        };

        if !self.registry.contains(&params.name) {
            return Some(JsonRpcResponse::error(
                Some(id),
                INVALID_PARAMS,
                &format!("Unknown tool: {}", params.name),
            ));
        }

        let key = id.to_string();
        if in_flight.contains_key(&key) {
            warn!(request = %key, "Duplicate in-flight request id");
            return Some(JsonRpcResponse::error(
                Some(id),
                INVALID_REQUEST,
                &format!("Request id {} is already in flight", key),
            ));
        }

        let registry = Arc::clone(&self.registry);
        let task_key = key.clone();
        let handle = tasks.spawn(async move {
            let ToolCallParams { name, arguments } = params;
            let result = AssertUnwindSafe(registry.dispatch(&name, arguments))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(tool = %name, "Tool handler panicked");
                    ToolCallResult::error(format!("Tool '{}' failed unexpectedly", name))
                });
            (task_key, success(id, &result))
        });
        in_flight.insert(key, handle);
        None
    }
}

/// Unwrap a joined task, dropping aborted calls.
fn completed(
    joined: std::result::Result<Completed, JoinError>,
    in_flight: &mut HashMap<String, AbortHandle>,
) -> Option<JsonRpcResponse> {
    match joined {
        Ok((key, response)) => {
            in_flight.remove(&key);
            Some(response)
        }
        Err(e) if e.is_cancelled() => {
            debug!("Cancelled tool call dropped");
            None
        }
        Err(e) => {
            error!(error = %e, "Tool task failed");
            None
        }
    }
}

fn success<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(Some(id), value),
        Err(e) => JsonRpcResponse::error(Some(id), INTERNAL_ERROR, &e.to_string()),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UltimarrError;
    use crate::mcp::registry::{Arguments, ToolDescriptor};
    use crate::mcp::tools::build_tool_registry;
    use crate::services::Services;
    use crate::test_support::{StubRoute, StubServer};
    use std::time::{Duration, Instant};

    async fn serve(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.run(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn server_for(stub: &StubServer) -> McpServer {
        let services = Services::connect(&stub.settings()).unwrap();
        McpServer::new(build_tool_registry(&services))
    }

    #[tokio::test]
    async fn test_initialize() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let out = serve(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{}}}"#,
        )
        .await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["jsonrpc"], "2.0");
        assert_eq!(out[0]["id"], 1);
        assert_eq!(out[0]["result"]["protocolVersion"], "2025-06-18");
        assert_eq!(out[0]["result"]["serverInfo"]["name"], "ultimarr");
        assert_eq!(out[0]["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_initialize_unknown_version_falls_back() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let out = serve(
            &server,
            r#"{"jsonrpc":"2.0","id":"a","method":"initialize","params":{"protocolVersion":"1999-01-01"}}"#,
        )
        .await;
        assert_eq!(out[0]["id"], "a");
        assert_eq!(out[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_batch_only_version_is_not_echoed() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let out = serve(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
        )
        .await;
        assert_eq!(out[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let out = serve(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let tools = out[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 15);
        let request = tools
            .iter()
            .find(|t| t["name"] == "jellyseerr_request")
            .unwrap();
        assert_eq!(
            request["inputSchema"]["properties"]["media_type"]["enum"],
            json!(["movie", "tv"])
        );
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let input = [
            "not json",
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#,
        ]
        .join("\n");
        let out = serve(&server, &input).await;

        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(out[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(out[2]["error"]["code"], INVALID_PARAMS);
        assert!(out[2]["error"]["message"].as_str().unwrap().contains("nope"));
        assert_eq!(out[3]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_valid_json_that_is_not_a_request() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let input = [
            r#"{"jsonrpc":"2.0","id":13}"#,
            r#"[{"jsonrpc":"2.0","id":14,"method":"ping"}]"#,
            r#"{"jsonrpc":"2.0","id":15,"method":"#,
        ]
        .join("\n");
        let out = serve(&server, &input).await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["error"]["code"], INVALID_REQUEST);
        assert_eq!(out[0]["id"], 13);
        assert_eq!(out[1]["error"]["code"], INVALID_REQUEST);
        assert!(out[1].get("id").is_none());
        assert_eq!(out[2]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let stub = StubServer::start(vec![]).await;
        let server = server_for(&stub);

        let input = [
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
        ]
        .join("\n");
        let out = serve(&server, &input).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 6);
        assert_eq!(out[0]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tool_failure_is_error_result() {
        let stub = StubServer::start(vec![StubRoute::new("GET", "/api/v3/queue", 500, "boom")]).await;
        let server = server_for(&stub);

        let out = serve(
            &server,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"radarr_queue"}}"#,
        )
        .await;

        assert_eq!(out[0]["id"], 7);
        assert_eq!(out[0]["result"]["isError"], true);
        assert_eq!(out[0]["result"]["content"][0]["type"], "text");
        assert_eq!(out[0]["result"]["content"][0]["text"], "HTTP 500: boom");
    }

    #[tokio::test]
    async fn test_tool_success_has_no_error_flag() {
        let body = json!({"records": []});
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/queue", &body)]).await;
        let server = server_for(&stub);

        let out = serve(
            &server,
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"sonarr_queue","arguments":{}}}"#,
        )
        .await;

        assert!(out[0]["result"].get("isError").is_none());
        assert_eq!(
            out[0]["result"]["content"][0]["text"],
            "Download Queue (0 items):\n\n  (empty)"
        );
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_others() {
        let stub = StubServer::start(vec![
            StubRoute::json("GET", "/api/v3/movie", &json!([]))
                .delayed(Duration::from_millis(400)),
            StubRoute::json("GET", "/api/v3/series", &json!([])),
        ])
        .await;
        let server = server_for(&stub);

        let input = [
            r#"{"jsonrpc":"2.0","id":"slow","method":"tools/call","params":{"name":"radarr_list_movies"}}"#,
            r#"{"jsonrpc":"2.0","id":"fast","method":"tools/call","params":{"name":"sonarr_list_series"}}"#,
        ]
        .join("\n");
        let out = serve(&server, &input).await;

        let ids: Vec<_> = out.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("fast"), json!("slow")]);
    }

    #[tokio::test]
    async fn test_cancelled_call_writes_nothing() {
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/series", &json!([]))
            .delayed(Duration::from_secs(5))])
        .await;
        let server = server_for(&stub);

        let input = [
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"sonarr_list_series"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":9,"reason":"user"}}"#,
            r#"{"jsonrpc":"2.0","id":10,"method":"ping"}"#,
        ]
        .join("\n");

        let started = Instant::now();
        let out = serve(&server, &input).await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 10);
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_id_is_rejected() {
        let stub = StubServer::start(vec![
            StubRoute::json("GET", "/api/v3/movie", &json!([])).delayed(Duration::from_secs(5)),
            StubRoute::json("GET", "/api/v3/series", &json!([])),
        ])
        .await;
        let server = server_for(&stub);

        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"radarr_list_movies"}}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"sonarr_list_series"}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
        ]
        .join("\n");

        let started = Instant::now();
        let out = serve(&server, &input).await;

        // The slow call stays cancellable and the duplicate never runs.
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 1);
        assert_eq!(out[0]["error"]["code"], INVALID_REQUEST);
        assert!(stub.requests().iter().all(|r| r.path != "/api/v3/series"));
    }

    #[tokio::test]
    async fn test_panicking_tool_is_isolated() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDescriptor::new("explode", "Always panics"), |_: Arguments| async {
            if true {
                panic!("handler exploded");
            }
            Ok::<String, UltimarrError>(String::new())
        });
        registry.register(ToolDescriptor::new("echo", "Returns a fixed string"), |_: Arguments| async {
            Ok::<String, UltimarrError>("still here".to_string())
        });
        let server = McpServer::new(registry);

        let input = [
            r#"{"jsonrpc":"2.0","id":11,"method":"tools/call","params":{"name":"explode"}}"#,
            r#"{"jsonrpc":"2.0","id":12,"method":"tools/call","params":{"name":"echo"}}"#,
        ]
        .join("\n");
        let mut out = serve(&server, &input).await;
        out.sort_by_key(|r| r["id"].as_i64());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["result"]["isError"], true);
        assert_eq!(out[1]["result"]["content"][0]["text"], "still here");
    }
}
