//! Wire types for the stdio JSON-RPC 2.0 server and MCP tool results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

// ── Error Codes ─────────────────────────────────────────────────────────────

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ── Envelope ────────────────────────────────────────────────────────────────

/// Incoming line. A missing `id` marks a notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Outgoing line; exactly one of `result` / `error` is set.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    fn reply(id: Value, result: Option<Value>, error: Option<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
            error,
        }
    }

    pub(crate) fn success(id: Value, result: Value) -> Self {
        Self::reply(id, Some(result), None)
    }

    pub(crate) fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        let error = JsonRpcError {
            code,
            message: message.into(),
        };
        Self::reply(id, None, Some(error))
    }
}

// ── Tool Results ────────────────────────────────────────────────────────────

/// Body of a `tools/call` reply.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(&self) -> &str {
        match self {
            ToolContent::Text { text } => text,
        }
    }
}

impl ToolResult {
    /// A dispatcher payload rendered as one pretty-printed text block.
    /// `isError` follows the payload's `status`.
    pub(crate) fn from_payload(payload: &Value) -> Self {
        let is_error = payload.get("status").and_then(Value::as_str) == Some("error");
        let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        Self {
            content: vec![ToolContent::Text { text }],
            is_error,
        }
    }
}
