//! MCP server over stdio: newline-delimited JSON-RPC 2.0.
//!
//! Exposes the five indexing tools through `initialize`, `tools/list`,
//! `tools/call` and `ping`. Progress messages from long-running tools go to
//! the log, never to stdout.

use crate::definitions::tool_definitions;
use crate::dispatcher::ToolDispatcher;
use crate::types::{
    JsonRpcRequest, JsonRpcResponse, ToolResult, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
    PARSE_ERROR,
};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

pub struct McpServer {
    name: String,
    version: String,
    dispatcher: ToolDispatcher,
}

impl McpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            name: "archindex".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Serve stdin/stdout until stdin closes.
    pub fn run(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), &mut stdout.lock())
    }

    /// Serve one request per line from `reader`, answering on `writer`.
    pub fn serve(&self, reader: impl BufRead, writer: &mut impl Write) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    tracing::warn!("Rejected malformed request line: {e}");
                    let resp = JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                    write_response(writer, &resp)?;
                    continue;
                }
            };

            let Some(id) = request.id else {
                self.handle_notification(&request.method);
                continue;
            };
            let response = self.handle_request(&request.method, request.params.as_ref(), id);
            write_response(writer, &response)?;
        }
        Ok(())
    }

    fn handle_notification(&self, method: &str) {
        if method == "notifications/initialized" {
            tracing::info!(server = %self.name, "MCP client connected");
        } else {
            tracing::debug!("Ignoring notification {method}");
        }
    }

    pub fn handle_request(
        &self,
        method: &str,
        params: Option<&Value>,
        id: Value,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => self.handle_initialize(id),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": self.name,
                    "version": self.version
                }
            }),
        )
    }

    fn handle_tools_call(&self, id: Value, params: Option<&Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params");
        };
        let tool_name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        let arguments = match params.get("arguments") {
            Some(args) if args.is_object() => args.clone(),
            _ => json!({}),
        };

        let mut log_progress = |msg: &str| tracing::info!(tool = tool_name, "{msg}");
        let payload = self
            .dispatcher
            .dispatch(tool_name, &arguments, Some(&mut log_progress));

        match serde_json::to_value(ToolResult::from_payload(&payload)) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}")),
        }
    }
}

/// One response per line, flushed so the client sees it immediately.
fn write_response(writer: &mut impl Write, response: &JsonRpcResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
