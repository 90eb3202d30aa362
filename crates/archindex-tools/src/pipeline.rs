//! Index and incremental-update runs.
//!
//! Index: validate → scan → parse → store → YAML.
//! Update: stored hashes → scan + hash → diff → purge → reparse changed →
//! store delta → YAML refresh.
//!
//! Concurrent runs against the same project must be serialized by the
//! caller; different projects never share points.

use archindex_core::{
    validate_path, FileNode, IndexerConfig, IndexerError, ParseStatus, Project, ProjectStatus,
};
use archindex_index::{compare, FileSummary, HashDiff, Indexer, Scanner, YamlEmitter};
use archindex_store::{StoredFile, SymbolStore};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Result of a full index run.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub project_id: Uuid,
    pub file_count: usize,
    pub files_indexed: usize,
    pub symbol_count: usize,
    pub errors: Vec<String>,
    pub output_dir: PathBuf,
}

/// Result of an incremental update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub project_id: Uuid,
    pub diff: HashDiff,
    pub files_processed: usize,
    pub file_count: usize,
    pub symbol_count: usize,
    pub output_dir: PathBuf,
}

pub struct Pipeline {
    config: IndexerConfig,
    store: Arc<SymbolStore>,
    indexer: Indexer,
}

impl Pipeline {
    pub fn new(config: IndexerConfig, store: Arc<SymbolStore>) -> Self {
        Self {
            config,
            store,
            indexer: Indexer::new(),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    /// Default excludes plus `extra`, first occurrence wins.
    fn excludes(&self, extra: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.config
            .default_excludes
            .iter()
            .chain(extra)
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }

    // ── Index ───────────────────────────────────────────────────────────────

    pub fn index_project(
        &self,
        path: &str,
        exclude_patterns: &[String],
        progress: &mut dyn FnMut(&str),
    ) -> Result<IndexOutcome, IndexerError> {
        let started = Instant::now();
        let root = validate_path(path, &self.config.allowed_roots)?;
        let root_str = root.to_string_lossy().to_string();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_str.clone());

        progress(&format!("Starting indexing of {root_str}"));

        let mut project = Project::new(name, root_str.clone());
        project.set_exclude_patterns(exclude_patterns);
        if let Some(existing) = self.store.find_project_by_root(&root_str)? {
            tracing::info!("Re-indexing {} as project {}", root_str, existing.id);
            project.id = existing.id;
            self.store.delete_project(existing.id)?;
        }
        self.store.store_project(&project)?;

        progress("Scanning directory...");
        let scanner = Scanner::new(&root, &self.excludes(exclude_patterns), self.config.max_file_size);
        let mut result = self.indexer.index_files(scanner.scan(), |node| {
            progress(&format!("Parsed {}", node.relative_path))
        });
        for node in &mut result.files {
            node.project_id = Some(project.id);
        }
        progress(&format!(
            "Found {} files with {} symbols",
            result.files.len(),
            result.total_symbols
        ));

        progress("Storing project in vector database...");
        if let Err(e) = self.store.store_files(project.id, &result.files) {
            self.mark_failed(&mut project);
            return Err(e);
        }

        project.status = ProjectStatus::Active;
        project.file_count = result.files.len();
        project.symbol_count = result.total_symbols;
        project.indexed_at = Some(Utc::now());
        self.store.store_project(&project)?;

        let output_dir = self.config.output_dir_for(&root, &project.name);
        progress(&format!("Writing YAML output to {}", output_dir.display()));
        let emitter = YamlEmitter::new(&output_dir);
        clear_file_snapshots(&emitter)?;
        emitter.write_project_yaml(&project)?;
        let summaries: Vec<FileSummary> = result.files.iter().map(FileSummary::from).collect();
        emitter.write_structure_yaml(&summaries)?;
        write_file_snapshots(&emitter, &result.files)?;

        progress("Indexing complete!");
        tracing::info!(
            project_id = %project.id,
            files = project.file_count,
            symbols = project.symbol_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexed {}",
            root_str
        );

        Ok(IndexOutcome {
            project_id: project.id,
            file_count: project.file_count,
            files_indexed: result.files_parsed,
            symbol_count: project.symbol_count,
            errors: result.errors,
            output_dir,
        })
    }

    // ── Update ──────────────────────────────────────────────────────────────

    pub fn update_project(
        &self,
        project_id: Uuid,
        force_full: bool,
        progress: &mut dyn FnMut(&str),
    ) -> Result<UpdateOutcome, IndexerError> {
        let started = Instant::now();
        let mut project = self
            .store
            .load_project(project_id)?
            .ok_or_else(|| IndexerError::NotFound(format!("Project not found: {project_id}")))?;

        let root = validate_path(&project.root_path, &self.config.allowed_roots).map_err(|e| {
            IndexerError::Validation(format!(
                "Project path no longer valid: {} ({e})",
                project.root_path
            ))
        })?;

        progress(&format!("Updating project: {}", project.name));

        // A partial baseline would turn stored files into "added" ones.
        let stored_files = self.store.load_files(project_id)?;
        let stored: HashMap<String, String> = stored_files
            .iter()
            .map(|f| (f.relative_path.clone(), f.content_hash.clone()))
            .collect();
        progress(&format!(
            "Found {} previously indexed files",
            stored_files.len()
        ));

        progress("Scanning for changes...");
        let scanner = Scanner::new(
            &root,
            &self.excludes(&project.exclude_patterns()),
            self.config.max_file_size,
        );
        let snapshot = self.indexer.snapshot(&scanner);

        let mut diff = compare(&snapshot.hashes, &stored);
        if force_full {
            progress("Force full re-index requested");
            let unchanged: Vec<String> = snapshot
                .hashes
                .keys()
                .filter(|p| stored.contains_key(*p) && !diff.modified.contains(*p))
                .cloned()
                .collect();
            diff.modified.extend(unchanged);
        }
        progress(&format!(
            "Changes: {} added, {} modified, {} deleted",
            diff.added.len(),
            diff.modified.len(),
            diff.deleted.len()
        ));
        tracing::debug!(
            "Diff for {}: added={:?} modified={:?} deleted={:?}",
            project_id,
            diff.added,
            diff.modified,
            diff.deleted
        );

        let purge: Vec<String> = diff.to_purge().into_iter().collect();
        if !purge.is_empty() {
            self.store.delete_symbols_by_file(project_id, &purge)?;
            progress(&format!("Removed {} file entries", purge.len()));
        }

        let reparse = diff.to_reparse();
        let to_parse = reparse
            .iter()
            .filter_map(|path| snapshot.files.get(path).cloned());
        let mut result = self.indexer.index_files(to_parse, |node| {
            progress(&format!("Re-indexed {}", node.relative_path))
        });
        for node in &mut result.files {
            node.project_id = Some(project_id);
        }
        if let Err(e) = self.store.store_files(project_id, &result.files) {
            self.mark_failed(&mut project);
            return Err(e);
        }

        let summaries = merge_summaries(&stored_files, &snapshot.hashes, &reparse, &result.files);
        project.file_count = summaries.len();
        project.symbol_count = summaries.iter().map(|s| s.symbol_count).sum();
        project.indexed_at = Some(Utc::now());
        project.status = ProjectStatus::Active;
        self.store.store_project(&project)?;

        let output_dir = self.config.output_dir_for(&root, &project.name);
        progress(&format!("Writing YAML output to {}", output_dir.display()));
        let emitter = YamlEmitter::new(&output_dir);
        emitter.write_project_yaml(&project)?;
        emitter.write_structure_yaml(&summaries)?;
        write_file_snapshots(&emitter, &result.files)?;
        for path in &diff.deleted {
            emitter.remove_file_yaml(path)?;
        }

        progress("Update complete!");
        tracing::info!(
            project_id = %project_id,
            added = diff.added.len(),
            modified = diff.modified.len(),
            deleted = diff.deleted.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Updated {}",
            project.name
        );

        Ok(UpdateOutcome {
            project_id,
            files_processed: result.files.len(),
            file_count: project.file_count,
            symbol_count: project.symbol_count,
            diff,
            output_dir,
        })
    }

    /// Best-effort `status = error`; the original failure is what matters.
    fn mark_failed(&self, project: &mut Project) {
        project.status = ProjectStatus::Error;
        if let Err(e) = self.store.store_project(project) {
            tracing::warn!("Could not mark project {} as failed: {}", project.id, e);
        }
    }
}

/// Unchanged stored files that still exist, plus freshly parsed ones.
fn merge_summaries(
    stored: &[StoredFile],
    current: &HashMap<String, String>,
    reparsed_paths: &BTreeSet<String>,
    reparsed: &[FileNode],
) -> Vec<FileSummary> {
    let mut summaries: Vec<FileSummary> = stored
        .iter()
        .filter(|f| current.contains_key(&f.relative_path))
        .filter(|f| !reparsed_paths.contains(&f.relative_path))
        .map(|f| FileSummary {
            relative_path: f.relative_path.clone(),
            language: f.language.clone(),
            size_bytes: f.size_bytes,
            symbol_count: f.symbol_count,
        })
        .collect();
    summaries.extend(reparsed.iter().map(FileSummary::from));
    summaries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    summaries
}

/// Per-file YAML for every parsed file; binary files get none (and lose
/// any stale snapshot).
fn write_file_snapshots(emitter: &YamlEmitter, files: &[FileNode]) -> Result<(), IndexerError> {
    for file in files {
        if file.parse_status == ParseStatus::Skipped {
            emitter.remove_file_yaml(&file.relative_path)?;
        } else {
            emitter.write_file_yaml(file)?;
        }
    }
    Ok(())
}

fn clear_file_snapshots(emitter: &YamlEmitter) -> Result<(), IndexerError> {
    remove_dir_if_exists(&emitter.files_dir())
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), IndexerError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
