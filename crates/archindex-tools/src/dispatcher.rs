//! Routes tool calls by name and turns every outcome into a JSON payload.
//!
//! Every payload carries `status`: `"success"` with tool-specific fields, or
//! `"error"` with an `error` message. Nothing escapes as a panic or `Err`.

use crate::definitions::{
    DELETE_PROJECT_INDEX, INDEX_PROJECT, LIST_INDEXED_PROJECTS, SEARCH_ARCHITECTURE,
    UPDATE_PROJECT_INDEX,
};
use crate::pipeline::Pipeline;
use archindex_core::{IndexerConfig, IndexerError};
use archindex_store::{InMemoryVectorClient, SymbolStore};
use serde_json::{json, Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 100;

pub struct ToolDispatcher {
    pipeline: Pipeline,
}

impl ToolDispatcher {
    pub fn new(config: IndexerConfig, store: Arc<SymbolStore>) -> Self {
        Self {
            pipeline: Pipeline::new(config, store),
        }
    }

    /// Dispatcher over a process-local vector store (nothing persists).
    pub fn in_memory(config: IndexerConfig) -> Self {
        let store = SymbolStore::new(Arc::new(InMemoryVectorClient::new()), &config.store);
        Self::new(config, Arc::new(store))
    }

    pub fn config(&self) -> &IndexerConfig {
        self.pipeline.config()
    }

    pub fn store(&self) -> &SymbolStore {
        self.pipeline.store()
    }

    /// Execute a tool. `progress` receives human-readable milestones from
    /// index and update runs.
    pub fn dispatch(
        &self,
        name: &str,
        args: &Value,
        progress: Option<&mut dyn FnMut(&str)>,
    ) -> Value {
        let mut ignore = |_: &str| {};
        let progress: &mut dyn FnMut(&str) = match progress {
            Some(p) => p,
            None => &mut ignore,
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| self.route(name, args, progress)));
        match outcome {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                tracing::warn!(tool = name, "Tool failed: {e}");
                error_payload(error_message(&e))
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool = name, "Tool panicked: {msg}");
                error_payload(format!("Internal error: {msg}"))
            }
        }
    }

    fn route(
        &self,
        name: &str,
        args: &Value,
        progress: &mut dyn FnMut(&str),
    ) -> Result<Value, IndexerError> {
        match name {
            INDEX_PROJECT => self.tool_index_project(args, progress),
            UPDATE_PROJECT_INDEX => self.tool_update_project_index(args, progress),
            SEARCH_ARCHITECTURE => self.tool_search_architecture(args),
            LIST_INDEXED_PROJECTS => Ok(self.tool_list_indexed_projects()),
            DELETE_PROJECT_INDEX => self.tool_delete_project_index(args),
            _ => Err(IndexerError::Validation(format!("Unknown tool: {name}"))),
        }
    }

    // ── Tools ───────────────────────────────────────────────────────────────

    fn tool_index_project(
        &self,
        args: &Value,
        progress: &mut dyn FnMut(&str),
    ) -> Result<Value, IndexerError> {
        let path = required_str(args, "path")?;
        let excludes = string_list(args, "exclude_patterns");
        let outcome = self.pipeline.index_project(path, &excludes, progress)?;
        Ok(json!({
            "status": "success",
            "project_id": outcome.project_id.to_string(),
            "file_count": outcome.file_count,
            "files_indexed": outcome.files_indexed,
            "symbol_count": outcome.symbol_count,
            "errors": outcome.errors,
            "output_dir": outcome.output_dir.to_string_lossy(),
        }))
    }

    fn tool_update_project_index(
        &self,
        args: &Value,
        progress: &mut dyn FnMut(&str),
    ) -> Result<Value, IndexerError> {
        let project_id = project_id(required_str(args, "project_id")?)?;
        let force_full = args
            .get("force_full")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let outcome = self.pipeline.update_project(project_id, force_full, progress)?;
        let diff = &outcome.diff;
        Ok(json!({
            "status": "success",
            "project_id": outcome.project_id.to_string(),
            "added": diff.added.len(),
            "modified": diff.modified.len(),
            "deleted": diff.deleted.len(),
            "files_processed": outcome.files_processed,
            "file_count": outcome.file_count,
            "symbol_count": outcome.symbol_count,
            "changes": {
                "added": diff.added,
                "modified": diff.modified,
                "deleted": diff.deleted,
            },
            "output_dir": outcome.output_dir.to_string_lossy(),
        }))
    }

    fn tool_search_architecture(&self, args: &Value) -> Result<Value, IndexerError> {
        let query = required_str(args, "query")?;
        let scope = match args.get("project_id").and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => Some(project_id(raw)?),
            _ => None,
        };
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).clamp(1, MAX_SEARCH_LIMIT))
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let results: Vec<Value> = self
            .store()
            .search_vectors(query, scope, limit)
            .into_iter()
            .map(|hit| {
                let mut entry = Map::new();
                entry.insert("id".into(), json!(hit.id));
                entry.insert("score".into(), json!(hit.score));
                for (key, value) in hit.payload {
                    entry.entry(key).or_insert(value);
                }
                Value::Object(entry)
            })
            .collect();

        Ok(json!({
            "status": "success",
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }

    fn tool_list_indexed_projects(&self) -> Value {
        let projects: Vec<Value> = self
            .store()
            .list_projects()
            .into_iter()
            .map(|p| {
                json!({
                    "project_id": p.id.to_string(),
                    "name": p.name,
                    "root_path": p.root_path,
                    "status": p.status.to_string(),
                    "file_count": p.file_count,
                    "symbol_count": p.symbol_count,
                    "indexed_at": p.indexed_at.map(|t| t.to_rfc3339()),
                })
            })
            .collect();
        json!({
            "status": "success",
            "count": projects.len(),
            "projects": projects,
        })
    }

    fn tool_delete_project_index(&self, args: &Value) -> Result<Value, IndexerError> {
        let raw = required_str(args, "project_id")?;
        let id = project_id(raw)?;
        if !self.store().delete_project(id)? {
            return Err(IndexerError::NotFound(format!("Project not found: {id}")));
        }
        Ok(json!({
            "status": "success",
            "message": format!("Project {id} deleted successfully"),
            "project_id": id.to_string(),
        }))
    }
}

// ── Argument Helpers ────────────────────────────────────────────────────────

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, IndexerError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| IndexerError::Validation(format!("Missing '{key}' parameter")))
}

fn string_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn project_id(raw: &str) -> Result<Uuid, IndexerError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| IndexerError::Validation(format!("Invalid project ID: {raw}")))
}

/// Validation and not-found messages are already user-facing; other
/// categories keep their prefix.
fn error_message(err: &IndexerError) -> String {
    match err {
        IndexerError::Validation(msg) | IndexerError::NotFound(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn error_payload(message: String) -> Value {
    json!({ "status": "error", "error": message })
}
