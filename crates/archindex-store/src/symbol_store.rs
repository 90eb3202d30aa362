//! Project, file and symbol persistence in one vector collection.
//!
//! Every point carries a `type` payload field (`project`, `file`, `symbol`)
//! and a `project_id`. Writes go through the [`RetryPolicy`]. Reads come in
//! two flavors: `load_*` retries and returns the error, for callers about
//! to write based on what they read; `get_*`/`list_*` log and degrade to
//! empty/`None`.

use crate::retry::RetryPolicy;
use archindex_core::{
    ClassDef, CollectionSpec, Distance, FileNode, FunctionDef, IndexerError, ParseStatus, Payload,
    Point, PointFilter, Project, ProjectStatus, StoreConfig, VectorClient,
};
use archindex_embeddings::EmbeddingProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Points per upsert call.
pub const BATCH_SIZE: usize = 64;

/// Points per scroll page.
const SCROLL_PAGE: usize = 256;

/// Payload fields with a keyword index.
pub const PAYLOAD_INDEXES: &[&str] = &[
    "project_id",
    "file_path",
    "symbol_type",
    "symbol_name",
    "language",
    "content_hash",
];

/// File-level summary as stored, used to rebuild structure output on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub relative_path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub parse_status: ParseStatus,
    pub symbol_count: usize,
}

/// One semantic search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

pub struct SymbolStore {
    client: Arc<dyn VectorClient>,
    collection: String,
    vector_size: usize,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    retry: RetryPolicy,
    ready: AtomicBool,
    indexed: AtomicBool,
}

impl SymbolStore {
    pub fn new(client: Arc<dyn VectorClient>, config: &StoreConfig) -> Self {
        Self {
            client,
            collection: config.collection.clone(),
            vector_size: config.vector_size,
            embedder: None,
            retry: RetryPolicy::from_config(config),
            ready: AtomicBool::new(false),
            indexed: AtomicBool::new(false),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        if embedder.dimensions() != self.vector_size {
            tracing::warn!(
                "Embedding provider {} yields {} dimensions, collection expects {}",
                embedder.name(),
                embedder.dimensions(),
                self.vector_size
            );
        }
        self.embedder = Some(embedder);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    // ── Collection ──────────────────────────────────────────────────────────

    /// Create the collection if absent and declare its payload indexes.
    /// Never recreates an existing collection. Index creation that fails is
    /// attempted again on the next call.
    pub fn ensure_collection(&self) -> Result<(), IndexerError> {
        if !self.ready.load(Ordering::Acquire) {
            self.create_collection_if_absent()?;
            self.ready.store(true, Ordering::Release);
        }
        if !self.indexed.load(Ordering::Acquire) && self.create_payload_indexes() {
            self.indexed.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn collection_exists(&self) -> Result<bool, IndexerError> {
        self.retry.run("collection exists", || {
            self.client.collection_exists(&self.collection)
        })
    }

    fn create_collection_if_absent(&self) -> Result<(), IndexerError> {
        if self.collection_exists()? {
            return Ok(());
        }
        let spec = CollectionSpec {
            name: self.collection.clone(),
            vector_size: self.vector_size,
            distance: Distance::Cosine,
        };
        match self
            .retry
            .run("create collection", || self.client.create_collection(&spec))
        {
            Ok(()) => {
                tracing::info!(
                    "Created collection {} ({} dims, cosine)",
                    self.collection,
                    self.vector_size
                );
                Ok(())
            }
            // Another writer may have created it since the existence check.
            Err(e) if self.collection_exists().unwrap_or(false) => {
                tracing::debug!("Collection {} appeared concurrently: {}", self.collection, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Declare every keyword index; `true` once all of them exist. Filtering
    /// works without them, only slower, so failures are logged.
    fn create_payload_indexes(&self) -> bool {
        let mut complete = true;
        for field in PAYLOAD_INDEXES {
            if let Err(e) = self.client.create_payload_index(&self.collection, field) {
                tracing::warn!("Payload index on {} not created: {}", field, e);
                complete = false;
            }
        }
        complete
    }

    // ── Projects ────────────────────────────────────────────────────────────

    pub fn store_project(&self, project: &Project) -> Result<Uuid, IndexerError> {
        self.ensure_collection()?;
        let point = Point {
            id: project.id.to_string(),
            vector: self.placeholder(),
            payload: project_payload(project),
        };
        self.retry.run("store project", || {
            self.client.upsert(&self.collection, vec![point.clone()])
        })?;
        Ok(project.id)
    }

    /// The stored project, or `None` if it is unknown.
    pub fn load_project(&self, project_id: Uuid) -> Result<Option<Project>, IndexerError> {
        let ids = [project_id.to_string()];
        let points = absent_as_empty(self.retry.run("get project", || {
            self.client.retrieve(&self.collection, &ids)
        }))?;
        Ok(points.iter().find_map(project_from_point))
    }

    pub fn get_project(&self, project_id: Uuid) -> Option<Project> {
        self.load_project(project_id).unwrap_or_else(|e| {
            tracing::warn!("Failed to retrieve project {}: {}", project_id, e);
            None
        })
    }

    /// All projects, sorted by name.
    pub fn load_projects(&self) -> Result<Vec<Project>, IndexerError> {
        let filter = PointFilter::new().matching("type", "project");
        let mut projects: Vec<Project> = self
            .scroll_all(&filter, "list projects")?
            .iter()
            .filter_map(project_from_point)
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.load_projects().unwrap_or_else(|e| {
            tracing::warn!("Failed to list projects: {}", e);
            Vec::new()
        })
    }

    /// The project previously indexed from `root_path`, if any. A store
    /// failure is an error, not "never indexed".
    pub fn find_project_by_root(&self, root_path: &str) -> Result<Option<Project>, IndexerError> {
        Ok(self
            .load_projects()?
            .into_iter()
            .find(|p| p.root_path == root_path))
    }

    /// Delete a project and every file/symbol point tagged with it.
    /// Returns `false` if the project is unknown.
    pub fn delete_project(&self, project_id: Uuid) -> Result<bool, IndexerError> {
        if self.load_project(project_id)?.is_none() {
            return Ok(false);
        }
        let filter = PointFilter::new().matching("project_id", project_id.to_string());
        self.retry
            .run("delete project", || self.client.delete(&self.collection, &filter))?;
        tracing::info!("Deleted project {}", project_id);
        Ok(true)
    }

    // ── Files and Symbols ───────────────────────────────────────────────────

    /// Write one `file` point per node plus one `symbol` point per
    /// function/class, in batches. Returns the number of points written.
    ///
    /// Does not purge: callers delete a file's old points first.
    pub fn store_files(&self, project_id: Uuid, files: &[FileNode]) -> Result<usize, IndexerError> {
        if files.is_empty() {
            return Ok(0);
        }
        self.ensure_collection()?;

        let pid = project_id.to_string();
        let mut pending: Vec<(Point, Option<String>)> = Vec::new();
        for file in files {
            pending.push((
                Point {
                    id: Uuid::new_v4().to_string(),
                    vector: Vec::new(),
                    payload: file_payload(&pid, file),
                },
                None,
            ));
            for func in &file.functions {
                pending.push(symbol_point(func.id, function_payload(&pid, file, func), || {
                    function_text(file, func)
                }));
            }
            for class in &file.classes {
                pending.push(symbol_point(class.id, class_payload(&pid, file, class), || {
                    class_text(file, class)
                }));
            }
        }

        let total = pending.len();
        for chunk in pending.chunks(BATCH_SIZE) {
            let points = self.vectorize(chunk);
            self.retry.run("store files", || {
                self.client.upsert(&self.collection, points.clone())
            })?;
        }
        tracing::debug!("Stored {} points for {} files", total, files.len());
        Ok(total)
    }

    /// `{relative_path: content_hash}` for every stored file of a project.
    pub fn get_file_hashes(&self, project_id: Uuid) -> HashMap<String, String> {
        self.list_files(project_id)
            .into_iter()
            .map(|f| (f.relative_path, f.content_hash))
            .collect()
    }

    /// Stored file summaries, sorted by path. Fails rather than return a
    /// partial list.
    pub fn load_files(&self, project_id: Uuid) -> Result<Vec<StoredFile>, IndexerError> {
        let filter = PointFilter::new()
            .matching("type", "file")
            .matching("project_id", project_id.to_string());
        let mut files: Vec<StoredFile> = self
            .scroll_all(&filter, "list files")?
            .iter()
            .filter_map(|p| stored_file(&p.payload))
            .collect();
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }

    pub fn list_files(&self, project_id: Uuid) -> Vec<StoredFile> {
        self.load_files(project_id).unwrap_or_else(|e| {
            tracing::warn!("Failed to list files of {}: {}", project_id, e);
            Vec::new()
        })
    }

    /// Purge file and symbol points for `paths`. Returns the number of paths
    /// requested.
    pub fn delete_symbols_by_file(
        &self,
        project_id: Uuid,
        paths: &[String],
    ) -> Result<usize, IndexerError> {
        if paths.is_empty() {
            return Ok(0);
        }
        let filter = PointFilter::new()
            .matching("project_id", project_id.to_string())
            .matching_any("file_path", paths.iter().cloned());
        self.retry.run("delete symbols", || {
            self.client.delete(&self.collection, &filter)
        })?;
        Ok(paths.len())
    }

    // ── Search ──────────────────────────────────────────────────────────────

    /// Nearest file/symbol points to `query`, optionally within one project.
    pub fn search_vectors(
        &self,
        query: &str,
        project_id: Option<Uuid>,
        limit: usize,
    ) -> Vec<SearchHit> {
        let vector = self.embed_one(query).unwrap_or_else(|| self.placeholder());

        let mut filter = PointFilter::new().matching_any("type", ["file", "symbol"]);
        if let Some(id) = project_id {
            filter = filter.matching("project_id", id.to_string());
        }

        match self.client.search(&self.collection, &vector, &filter, limit) {
            Ok(hits) => hits
                .into_iter()
                .map(|h| SearchHit {
                    id: h.id,
                    score: h.score,
                    payload: h.payload,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                Vec::new()
            }
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn placeholder(&self) -> Vec<f32> {
        vec![0.0; self.vector_size]
    }

    fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text) {
            Ok(v) if v.len() == self.vector_size => Some(v),
            Ok(v) => {
                tracing::warn!(
                    "Embedding has {} dimensions, expected {}",
                    v.len(),
                    self.vector_size
                );
                None
            }
            Err(e) => {
                tracing::warn!("Embedding failed: {}", e);
                None
            }
        }
    }

    /// Fill in vectors: embedded text where available, placeholder otherwise.
    fn vectorize(&self, chunk: &[(Point, Option<String>)]) -> Vec<Point> {
        let texts: Vec<&str> = chunk.iter().filter_map(|(_, t)| t.as_deref()).collect();
        let mut embedded = match (&self.embedder, texts.is_empty()) {
            (Some(embedder), false) => match embedder.embed_batch(&texts) {
                Ok(vectors) if vectors.len() == texts.len() => vectors.into_iter(),
                Ok(_) | Err(_) => {
                    tracing::warn!("Embedding batch failed; storing placeholder vectors");
                    Vec::new().into_iter()
                }
            },
            _ => Vec::new().into_iter(),
        };

        chunk
            .iter()
            .map(|(point, text)| {
                let vector = text
                    .as_ref()
                    .and_then(|_| embedded.next())
                    .filter(|v| v.len() == self.vector_size)
                    .unwrap_or_else(|| self.placeholder());
                Point {
                    id: point.id.clone(),
                    vector,
                    payload: point.payload.clone(),
                }
            })
            .collect()
    }

    /// Every matching point, page by page. Each page is retried on its own;
    /// a page that still fails fails the whole scroll.
    fn scroll_all(&self, filter: &PointFilter, what: &str) -> Result<Vec<Point>, IndexerError> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;
        loop {
            let page = self.retry.run(what, || {
                self.client
                    .scroll(&self.collection, filter, SCROLL_PAGE, offset.clone())
            });
            let page = match page {
                Ok(page) => page,
                Err(IndexerError::NotFound(_)) if offset.is_none() => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };
            points.extend(page.points);
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => return Ok(points),
            }
        }
    }
}

/// A missing collection reads as empty.
fn absent_as_empty<T: Default>(result: Result<T, IndexerError>) -> Result<T, IndexerError> {
    match result {
        Err(IndexerError::NotFound(_)) => Ok(T::default()),
        other => other,
    }
}

// ── Payload Encoding ──────────────────────────────────────────────────────

fn symbol_point(
    id: Uuid,
    payload: Payload,
    text: impl FnOnce() -> String,
) -> (Point, Option<String>) {
    (
        Point {
            id: id.to_string(),
            vector: Vec::new(),
            payload,
        },
        Some(text()),
    )
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn project_payload(project: &Project) -> Payload {
    object(json!({
        "type": "project",
        "project_id": project.id.to_string(),
        "name": project.name,
        "root_path": project.root_path,
        "status": project.status.to_string(),
        "file_count": project.file_count,
        "symbol_count": project.symbol_count,
        "indexed_at": project.indexed_at.map(|t| t.to_rfc3339()),
        "config": project.config,
    }))
}

fn file_payload(project_id: &str, file: &FileNode) -> Payload {
    object(json!({
        "type": "file",
        "project_id": project_id,
        "file_path": file.relative_path,
        "language": file.language,
        "content_hash": file.content_hash,
        "size_bytes": file.size_bytes,
        "last_modified": file.last_modified.to_rfc3339(),
        "parse_status": file.parse_status.to_string(),
        "error_message": file.error_message,
        "symbol_count": file.symbol_count(),
    }))
}

fn function_payload(project_id: &str, file: &FileNode, func: &FunctionDef) -> Payload {
    let symbol_type = if func.is_method { "method" } else { "function" };
    object(json!({
        "type": "symbol",
        "project_id": project_id,
        "file_path": file.relative_path,
        "language": file.language,
        "content_hash": file.content_hash,
        "symbol_type": symbol_type,
        "symbol_name": func.name,
        "line_number": func.line_number,
        "end_line": func.end_line,
        "signature": func.signature,
        "return_type": func.return_type,
        "docstring": func.docstring,
        "is_async": func.is_async,
        "parent_class": func.parent_class,
        "decorators": func.decorators,
    }))
}

fn class_payload(project_id: &str, file: &FileNode, class: &ClassDef) -> Payload {
    object(json!({
        "type": "symbol",
        "project_id": project_id,
        "file_path": file.relative_path,
        "language": file.language,
        "content_hash": file.content_hash,
        "symbol_type": "class",
        "symbol_name": class.name,
        "line_number": class.line_number,
        "end_line": class.end_line,
        "parent_classes": class.parent_classes,
        "method_names": class.method_names,
        "docstring": class.docstring,
        "decorators": class.decorators,
    }))
}

fn function_text(file: &FileNode, func: &FunctionDef) -> String {
    let kind = if func.is_method { "method" } else { "function" };
    let mut text = format!("{} {} in {}", kind, func.name, file.relative_path);
    if let Some(parent) = &func.parent_class {
        text.push_str(&format!(" (class {parent})"));
    }
    text.push('\n');
    text.push_str(&func.signature);
    if let Some(doc) = &func.docstring {
        text.push('\n');
        text.push_str(doc);
    }
    text
}

fn class_text(file: &FileNode, class: &ClassDef) -> String {
    let mut text = format!("class {} in {}", class.name, file.relative_path);
    if !class.parent_classes.is_empty() {
        text.push_str(&format!(" extends {}", class.parent_classes.join(", ")));
    }
    if !class.method_names.is_empty() {
        text.push_str(&format!("\nmethods: {}", class.method_names.join(", ")));
    }
    if let Some(doc) = &class.docstring {
        text.push('\n');
        text.push_str(doc);
    }
    text
}

// ── Payload Decoding ──────────────────────────────────────────────────────

fn str_field<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn usize_field(payload: &Payload, key: &str) -> usize {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize
}

fn project_from_point(point: &Point) -> Option<Project> {
    let payload = &point.payload;
    if str_field(payload, "type") != Some("project") {
        return None;
    }
    let id = str_field(payload, "project_id")
        .unwrap_or(&point.id)
        .parse::<Uuid>()
        .ok()?;
    let status = str_field(payload, "status")
        .and_then(|s| s.parse::<ProjectStatus>().ok())
        .unwrap_or(ProjectStatus::Active);
    let indexed_at = str_field(payload, "indexed_at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    let config = payload
        .get("config")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Some(Project {
        id,
        name: str_field(payload, "name").unwrap_or_default().to_string(),
        root_path: str_field(payload, "root_path").unwrap_or_default().to_string(),
        status,
        file_count: usize_field(payload, "file_count"),
        symbol_count: usize_field(payload, "symbol_count"),
        indexed_at,
        config,
    })
}

fn stored_file(payload: &Payload) -> Option<StoredFile> {
    let relative_path = str_field(payload, "file_path")?.to_string();
    let content_hash = str_field(payload, "content_hash")?.to_string();
    Some(StoredFile {
        relative_path,
        content_hash,
        language: str_field(payload, "language").unwrap_or_default().to_string(),
        size_bytes: payload
            .get("size_bytes")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        parse_status: str_field(payload, "parse_status")
            .and_then(|s| s.parse().ok())
            .unwrap_or(ParseStatus::Success),
        symbol_count: usize_field(payload, "symbol_count"),
    })
}
