//! Subcommands: one-shot tool calls, the stdio server and tool listing.

use archindex_core::IndexerConfig;
use archindex_store::{QdrantClient, SymbolStore};
use archindex_tools::{McpServer, ToolDispatcher};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Qdrant-backed dispatcher. An unusable embedding provider is logged and
/// skipped so listing and deletion still work.
pub(crate) fn build_dispatcher(config: IndexerConfig) -> anyhow::Result<ToolDispatcher> {
    let client = Arc::new(QdrantClient::from_config(&config.store)?);
    let mut store = SymbolStore::new(client, &config.store);

    match archindex_embeddings::from_config(&config.embedding) {
        Ok(Some(provider)) => {
            tracing::info!("Embedding provider: {}", provider.name());
            store = store.with_embedder(Arc::from(provider));
        }
        Ok(None) => {
            tracing::info!("No embedding provider configured, storing placeholder vectors");
        }
        Err(e) => {
            tracing::warn!("Embedding provider unavailable, continuing without embeddings: {e}");
        }
    }

    Ok(ToolDispatcher::new(config, Arc::new(store)))
}

/// Run one tool, streaming progress to stderr and the payload to stdout.
fn run_tool(config: IndexerConfig, tool: &str, args: Value) -> anyhow::Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let mut progress = |msg: &str| eprintln!("  {msg}");
    let payload = dispatcher.dispatch(tool, &args, Some(&mut progress));
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if payload["status"] == "error" {
        anyhow::bail!("{tool} failed");
    }
    Ok(())
}

pub(crate) fn cmd_index(config: IndexerConfig, root: &Path, exclude: &[String]) -> anyhow::Result<()> {
    let args = json!({
        "path": root.to_string_lossy(),
        "exclude_patterns": exclude,
    });
    run_tool(config, "index_project", args)
}

pub(crate) fn cmd_update(config: IndexerConfig, project_id: &str, force_full: bool) -> anyhow::Result<()> {
    run_tool(
        config,
        "update_project_index",
        json!({ "project_id": project_id, "force_full": force_full }),
    )
}

pub(crate) fn cmd_search(
    config: IndexerConfig,
    query: &str,
    project_id: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let mut args = json!({ "query": query, "limit": limit });
    if let Some(id) = project_id {
        args["project_id"] = json!(id);
    }
    run_tool(config, "search_architecture", args)
}

pub(crate) fn cmd_list(config: IndexerConfig) -> anyhow::Result<()> {
    run_tool(config, "list_indexed_projects", json!({}))
}

pub(crate) fn cmd_delete(config: IndexerConfig, project_id: &str) -> anyhow::Result<()> {
    run_tool(config, "delete_project_index", json!({ "project_id": project_id }))
}

pub(crate) fn cmd_serve(config: IndexerConfig) -> anyhow::Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let store_url = dispatcher.config().store.url.clone();
    let server = McpServer::new(dispatcher);
    tracing::info!("archindex MCP server ready (stdio mode, store: {store_url})");
    server.run()?;
    Ok(())
}

pub(crate) fn cmd_tools(openai: bool) -> anyhow::Result<()> {
    let defs = if openai {
        archindex_tools::openai_tool_definitions()
    } else {
        archindex_tools::tool_definitions()
    };
    println!("{}", serde_json::to_string_pretty(&defs)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_survives_bad_embedding_provider() {
        let mut config = IndexerConfig::default();
        config.embedding.provider = "carrier-pigeon".into();
        let dispatcher = build_dispatcher(config).unwrap();
        assert!(!dispatcher.store().has_embedder());
    }

    #[test]
    fn dispatcher_without_provider() {
        let mut config = IndexerConfig::default();
        config.embedding.provider = "none".into();
        let dispatcher = build_dispatcher(config).unwrap();
        assert!(!dispatcher.store().has_embedder());
        assert_eq!(dispatcher.store().collection(), "project_architecture");
    }
}
