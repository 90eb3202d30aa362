//! Tool catalogue: names, descriptions and JSON-Schema parameters.
//!
//! One source, two shapes: MCP (`inputSchema`) and OpenAI function-calling
//! (`{"type": "function", "function": {..., "parameters"}}`).

use serde_json::{json, Value};

pub const INDEX_PROJECT: &str = "index_project";
pub const UPDATE_PROJECT_INDEX: &str = "update_project_index";
pub const SEARCH_ARCHITECTURE: &str = "search_architecture";
pub const LIST_INDEXED_PROJECTS: &str = "list_indexed_projects";
pub const DELETE_PROJECT_INDEX: &str = "delete_project_index";

/// `(name, description, parameters schema)` for every tool.
fn catalogue() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (
            INDEX_PROJECT,
            "Index a codebase to understand its architecture",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the project root directory"
                    },
                    "exclude_patterns": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Additional glob patterns to exclude (e.g. 'tests/**')"
                    }
                },
                "required": ["path"]
            }),
        ),
        (
            UPDATE_PROJECT_INDEX,
            "Update index for changed files in a project",
            json!({
                "type": "object",
                "properties": {
                    "project_id": {
                        "type": "string",
                        "description": "ID of the project to update"
                    },
                    "force_full": {
                        "type": "boolean",
                        "description": "Re-parse every file instead of only changed ones",
                        "default": false
                    }
                },
                "required": ["project_id"]
            }),
        ),
        (
            SEARCH_ARCHITECTURE,
            "Search indexed project architecture",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural-language description of the code to find"
                    },
                    "project_id": {
                        "type": "string",
                        "description": "Project to search (optional, searches all if omitted)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "minimum": 1,
                        "maximum": 100
                    }
                },
                "required": ["query"]
            }),
        ),
        (
            LIST_INDEXED_PROJECTS,
            "List all indexed projects",
            json!({ "type": "object", "properties": {} }),
        ),
        (
            DELETE_PROJECT_INDEX,
            "Remove a project from the index",
            json!({
                "type": "object",
                "properties": {
                    "project_id": {
                        "type": "string",
                        "description": "ID of the project to delete"
                    }
                },
                "required": ["project_id"]
            }),
        ),
    ]
}

/// Tool list as returned by MCP `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    catalogue()
        .into_iter()
        .map(|(name, description, schema)| {
            json!({ "name": name, "description": description, "inputSchema": schema })
        })
        .collect()
}

/// Tool list in OpenAI function-calling format, for agent frameworks.
pub fn openai_tool_definitions() -> Vec<Value> {
    catalogue()
        .into_iter()
        .map(|(name, description, schema)| {
            json!({
                "type": "function",
                "function": { "name": name, "description": description, "parameters": schema }
            })
        })
        .collect()
}
