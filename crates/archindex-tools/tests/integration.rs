//! Integration tests for archindex-tools: full JSON-RPC lifecycle against an
//! in-process vector store.

use archindex_core::IndexerConfig;
use archindex_store::{InMemoryVectorClient, RetryPolicy, SymbolStore};
use archindex_tools::{McpServer, ToolDispatcher};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Helpers ────────────────────────────────────────────────────────────────

struct Workspace {
    _dir: tempfile::TempDir,
    project: PathBuf,
    output: PathBuf,
    server: McpServer,
}

const SERVICE_PY: &str = r#"from base import Base


def add(a: int, b: int) -> int:
    return a + b


class Greeter(Base):
    """Says hello."""
"#;

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let project = base.join("proj");
    let output = base.join("out");
    fs::create_dir_all(project.join("pkg")).unwrap();
    fs::write(project.join("pkg/service.py"), SERVICE_PY).unwrap();
    fs::write(project.join("app.js"), "function start(port) {\n  return port;\n}\n").unwrap();

    let config = IndexerConfig {
        allowed_roots: vec![base.clone()],
        output_dir: Some(output.clone()),
        ..IndexerConfig::default()
    };
    let store = SymbolStore::new(Arc::new(InMemoryVectorClient::new()), &config.store)
        .with_retry(RetryPolicy::none());
    let server = McpServer::new(ToolDispatcher::new(config, Arc::new(store)));
    Workspace {
        _dir: dir,
        project,
        output,
        server,
    }
}

/// Call tools/call and return the response result value.
fn call_tool(server: &McpServer, tool_name: &str, arguments: Value) -> Value {
    let params = json!({"name": tool_name, "arguments": arguments});
    let resp = server.handle_request("tools/call", Some(&params), json!("req"));
    assert!(
        resp.error.is_none(),
        "Unexpected error calling {tool_name}: {:?}",
        resp.error
    );
    resp.result.unwrap()
}

/// Call tools/call and parse the text content from the result as JSON.
fn call_tool_parse(server: &McpServer, tool_name: &str, arguments: Value) -> Value {
    let result = call_tool(server, tool_name, arguments);
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn index(ws: &Workspace) -> Value {
    let out = call_tool_parse(
        &ws.server,
        "index_project",
        json!({"path": ws.project.to_str().unwrap()}),
    );
    assert_eq!(out["status"], "success", "index failed: {out}");
    out
}

fn read_yaml(path: &Path) -> serde_yaml::Value {
    serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ── Indexing ───────────────────────────────────────────────────────────────

#[test]
fn index_extracts_symbols_and_writes_yaml() {
    let ws = workspace();
    let out = index(&ws);
    assert_eq!(out["file_count"], 2);
    // add, Greeter, start
    assert_eq!(out["symbol_count"], 3);
    assert_eq!(out["output_dir"], ws.output.join("proj").to_str().unwrap());

    let out_dir = ws.output.join("proj");
    let project = read_yaml(&out_dir.join("project.yaml"));
    assert_eq!(project["project"]["id"].as_str(), out["project_id"].as_str());
    assert_eq!(project["project"]["status"].as_str(), Some("active"));
    assert_eq!(project["project"]["statistics"]["total_files"].as_u64(), Some(2));

    let file = read_yaml(&out_dir.join("files/pkg_service.py.yaml"));
    assert_eq!(file["file"]["language"].as_str(), Some("python"));
    let add = &file["functions"][0];
    assert_eq!(add["name"].as_str(), Some("add"));
    assert_eq!(add["parameters"].as_sequence().map(Vec::len), Some(2));
    assert_eq!(add["return_type"].as_str(), Some("int"));
    let greeter = &file["classes"][0];
    assert_eq!(greeter["name"].as_str(), Some("Greeter"));
    assert_eq!(greeter["parent_classes"][0].as_str(), Some("Base"));
    assert_eq!(greeter["docstring"].as_str(), Some("Says hello."));

    let structure = read_yaml(&out_dir.join("structure.yaml"));
    let top: Vec<&str> = structure["structure"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert_eq!(top, vec!["pkg", "app.js"]);
}

#[test]
fn indexed_project_is_listed() {
    let ws = workspace();
    let out = index(&ws);
    let list = call_tool_parse(&ws.server, "list_indexed_projects", json!({}));
    assert_eq!(list["count"], 1);
    let project = &list["projects"][0];
    assert_eq!(project["project_id"], out["project_id"]);
    assert_eq!(project["name"], "proj");
    assert_eq!(project["status"], "active");
    assert_eq!(project["symbol_count"], 3);
    assert!(project["indexed_at"].is_string());
}

// ── Updates ────────────────────────────────────────────────────────────────

#[test]
fn unchanged_update_is_empty_diff() {
    let ws = workspace();
    let id = index(&ws)["project_id"].clone();
    let out = call_tool_parse(&ws.server, "update_project_index", json!({"project_id": id}));
    assert_eq!(out["status"], "success");
    assert_eq!(out["added"], 0);
    assert_eq!(out["modified"], 0);
    assert_eq!(out["deleted"], 0);
    assert_eq!(out["files_processed"], 0);
    assert_eq!(out["symbol_count"], 3);
}

#[test]
fn deleted_file_leaves_index_and_yaml() {
    let ws = workspace();
    let id = index(&ws)["project_id"].clone();
    fs::remove_file(ws.project.join("app.js")).unwrap();

    let out = call_tool_parse(&ws.server, "update_project_index", json!({"project_id": id}));
    assert_eq!(out["deleted"], 1);
    assert_eq!(out["changes"]["deleted"], json!(["app.js"]));
    assert_eq!(out["file_count"], 1);
    assert_eq!(out["symbol_count"], 2);

    let uuid = uuid::Uuid::parse_str(id.as_str().unwrap()).unwrap();
    let hashes = ws.server.dispatcher().store().get_file_hashes(uuid);
    assert!(!hashes.contains_key("app.js"));
    assert!(hashes.contains_key("pkg/service.py"));
    assert!(!ws.output.join("proj/files/app.js.yaml").exists());
}

#[test]
fn modified_file_is_reparsed() {
    let ws = workspace();
    let id = index(&ws)["project_id"].clone();
    fs::write(
        ws.project.join("app.js"),
        "function start(port) {\n  return port;\n}\n\nfunction stop() {}\n",
    )
    .unwrap();

    let out = call_tool_parse(&ws.server, "update_project_index", json!({"project_id": id}));
    assert_eq!(out["changes"]["modified"], json!(["app.js"]));
    assert_eq!(out["files_processed"], 1);
    assert_eq!(out["symbol_count"], 4);

    let file = read_yaml(&ws.output.join("proj/files/app.js.yaml"));
    assert_eq!(file["functions"].as_sequence().map(Vec::len), Some(2));
}

// ── Search and Delete ──────────────────────────────────────────────────────

#[test]
fn search_scoped_to_project() {
    let ws = workspace();
    let id = index(&ws)["project_id"].clone();
    let out = call_tool_parse(
        &ws.server,
        "search_architecture",
        json!({"query": "greeting", "project_id": id, "limit": 50}),
    );
    assert_eq!(out["status"], "success");
    assert_eq!(out["query"], "greeting");
    // 2 file points + 3 symbol points, no project point
    assert_eq!(out["count"], 5);
    for hit in out["results"].as_array().unwrap() {
        assert_eq!(hit["project_id"], id);
        assert!(hit["id"].is_string());
        assert!(hit["score"].is_number());
    }
}

#[test]
fn delete_removes_project() {
    let ws = workspace();
    let id = index(&ws)["project_id"].clone();
    let out = call_tool_parse(&ws.server, "delete_project_index", json!({"project_id": id}));
    assert_eq!(out["status"], "success");
    assert_eq!(
        out["message"],
        format!("Project {} deleted successfully", id.as_str().unwrap())
    );

    let list = call_tool_parse(&ws.server, "list_indexed_projects", json!({}));
    assert_eq!(list["count"], 0);

    let again = call_tool(&ws.server, "delete_project_index", json!({"project_id": id}));
    assert_eq!(again["isError"], true);
}

// ── Errors ─────────────────────────────────────────────────────────────────

#[test]
fn error_unknown_tool() {
    let ws = workspace();
    let result = call_tool(&ws.server, "reindex_everything", json!({}));
    assert_eq!(result["isError"], true);
    let out = call_tool_parse(&ws.server, "reindex_everything", json!({}));
    assert_eq!(out["error"], "Unknown tool: reindex_everything");
}

#[test]
fn error_invalid_project_id() {
    let ws = workspace();
    let out = call_tool_parse(
        &ws.server,
        "update_project_index",
        json!({"project_id": "definitely-not-a-uuid"}),
    );
    assert_eq!(out["status"], "error");
    assert_eq!(out["error"], "Invalid project ID: definitely-not-a-uuid");
}

#[test]
fn error_path_traversal() {
    let ws = workspace();
    let sneaky = format!("{}/../proj", ws.project.display());
    let out = call_tool_parse(&ws.server, "index_project", json!({"path": sneaky}));
    assert_eq!(out["error"], "Path traversal not allowed");
}

#[test]
fn error_path_outside_allowed_roots() {
    let ws = workspace();
    let elsewhere = tempfile::tempdir().unwrap();
    let out = call_tool_parse(
        &ws.server,
        "index_project",
        json!({"path": elsewhere.path().to_str().unwrap()}),
    );
    assert_eq!(out["status"], "error");
    assert!(out["error"].as_str().unwrap().starts_with("Path not in allowed roots"));
}

// ── Protocol ───────────────────────────────────────────────────────────────

#[test]
fn full_lifecycle_over_serve() {
    let ws = workspace();
    let path = ws.project.to_str().unwrap().to_string();
    let requests = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "index_project", "arguments": {"path": path}}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
               "params": {"name": "list_indexed_projects", "arguments": {}}}),
    ];
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();

    let mut output = Vec::new();
    ws.server.serve(input.as_bytes(), &mut output).unwrap();
    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "archindex");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 5);
    assert_eq!(responses[2]["result"]["isError"], false);
    let listed: Value =
        serde_json::from_str(responses[3]["result"]["content"][0]["text"].as_str().unwrap())
            .unwrap();
    assert_eq!(listed["count"], 1);
}
