//! archindex-tools: the five indexing tools and their MCP server.
//!
//! Tools: index_project, update_project_index, search_architecture,
//! list_indexed_projects, delete_project_index.
//!
//! Transport: Newline-delimited JSON-RPC messages over stdio.
//! All logging goes to stderr; stdout is reserved for JSON-RPC only.

pub mod definitions;
pub mod dispatcher;
pub mod pipeline;
pub mod server;
pub mod types;

pub use definitions::{openai_tool_definitions, tool_definitions};
pub use dispatcher::{ToolDispatcher, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
pub use pipeline::{IndexOutcome, Pipeline, UpdateOutcome};
pub use server::McpServer;
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolContent, ToolResult};
