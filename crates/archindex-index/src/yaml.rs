//! YAML snapshots of an indexed project.
//!
//! Layout under the output directory:
//!
//! ```text
//! project.yaml            identity, statistics, status, config
//! structure.yaml          directory/file tree
//! files/{sanitized}.yaml  per-file functions and classes
//! ```

use archindex_core::{FileNode, IndexerError, Project};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ── Documents ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub project: ProjectSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub id: String,
    pub name: String,
    pub root_path: String,
    pub indexed_at: Option<String>,
    pub statistics: Statistics,
    pub status: String,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: usize,
    pub total_symbols: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDocument {
    pub structure: Vec<StructureEntry>,
}

/// A directory (with `children`) or a file (with language, size, symbols).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<StructureEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDocument {
    pub file: FileHeader,
    pub functions: Vec<FunctionEntry>,
    pub classes: Vec<ClassEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub path: String,
    pub language: String,
    pub size_bytes: u64,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub line: usize,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_annotation: Option<String>,
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_variadic: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Vec<String>>,
}

/// What `structure.yaml` needs to know about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub relative_path: String,
    pub language: String,
    pub size_bytes: u64,
    pub symbol_count: usize,
}

impl From<&FileNode> for FileSummary {
    fn from(file: &FileNode) -> Self {
        Self {
            relative_path: file.relative_path.clone(),
            language: file.language.clone(),
            size_bytes: file.size_bytes,
            symbol_count: file.symbol_count(),
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

impl From<&Project> for ProjectDocument {
    fn from(project: &Project) -> Self {
        Self {
            project: ProjectSection {
                id: project.id.to_string(),
                name: project.name.clone(),
                root_path: project.root_path.clone(),
                indexed_at: project.indexed_at.map(|t| t.to_rfc3339()),
                statistics: Statistics {
                    total_files: project.file_count,
                    total_symbols: project.symbol_count,
                },
                status: project.status.to_string(),
                config: project.config.clone(),
            },
        }
    }
}

impl From<&FileNode> for FileDocument {
    fn from(file: &FileNode) -> Self {
        let functions = file
            .functions
            .iter()
            .map(|f| FunctionEntry {
                name: f.name.clone(),
                line: f.line_number,
                signature: f.signature.clone(),
                parameters: non_empty(
                    f.parameters
                        .iter()
                        .filter(|p| p.name != "self" && p.name != "cls")
                        .map(|p| ParameterEntry {
                            name: p.name.clone(),
                            type_annotation: p.type_annotation.clone(),
                            default: p.default.clone(),
                            is_variadic: p.is_variadic.then_some(true),
                        })
                        .collect(),
                ),
                return_type: f.return_type.clone(),
                docstring: f.docstring.clone(),
                is_async: f.is_async.then_some(true),
                parent_class: f.parent_class.clone(),
                decorators: non_empty(f.decorators.clone()),
            })
            .collect();

        let classes = file
            .classes
            .iter()
            .map(|c| ClassEntry {
                name: c.name.clone(),
                line: c.line_number,
                parent_classes: non_empty(c.parent_classes.clone()),
                docstring: c.docstring.clone(),
                methods: non_empty(c.method_names.clone()),
                decorators: non_empty(c.decorators.clone()),
            })
            .collect();

        Self {
            file: FileHeader {
                path: file.relative_path.clone(),
                language: file.language.clone(),
                size_bytes: file.size_bytes,
                content_hash: file.content_hash.clone(),
            },
            functions,
            classes,
        }
    }
}

// ── Structure Tree ────────────────────────────────────────────────────────

#[derive(Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, FileSummary>,
}

/// Group flat relative paths into a tree; directories first, then files,
/// each sorted by name.
pub fn build_structure(files: &[FileSummary]) -> Vec<StructureEntry> {
    let mut root = DirNode::default();
    for file in files {
        let parts: Vec<&str> = file.relative_path.split('/').collect();
        let Some((name, dirs)) = parts.split_last() else {
            continue;
        };
        let mut current = &mut root;
        for dir in dirs {
            current = current.dirs.entry(dir.to_string()).or_default();
        }
        current.files.insert(name.to_string(), file.clone());
    }
    flatten(&root, "")
}

fn flatten(node: &DirNode, prefix: &str) -> Vec<StructureEntry> {
    let mut entries = Vec::with_capacity(node.dirs.len() + node.files.len());
    for (name, dir) in &node.dirs {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        entries.push(StructureEntry {
            children: Some(flatten(dir, &path)),
            path,
            kind: "directory".to_string(),
            language: None,
            size_bytes: None,
            symbols: None,
        });
    }
    for file in node.files.values() {
        entries.push(StructureEntry {
            path: file.relative_path.clone(),
            kind: "file".to_string(),
            children: None,
            language: Some(file.language.clone()),
            size_bytes: Some(file.size_bytes),
            symbols: Some(file.symbol_count),
        });
    }
    entries
}

// ── Emitter ───────────────────────────────────────────────────────────────

/// `a/b.py` → `a_b.py`.
///
/// Paths differing only in separator placement (`a/b.py`, `a_b.py`) map to
/// the same name; the later write wins.
pub fn sanitize_path_for_filename(path: &str) -> String {
    path.replace(['/', '\\'], "_")
}

/// Writes YAML snapshots under one output directory.
pub struct YamlEmitter {
    output_dir: PathBuf,
}

impl YamlEmitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn files_dir(&self) -> PathBuf {
        self.output_dir.join("files")
    }

    /// Path of the snapshot for a source file.
    pub fn file_yaml_path(&self, relative_path: &str) -> PathBuf {
        self.files_dir()
            .join(format!("{}.yaml", sanitize_path_for_filename(relative_path)))
    }

    pub fn write_project_yaml(&self, project: &Project) -> Result<PathBuf, IndexerError> {
        let path = self.output_dir.join("project.yaml");
        write_yaml(&path, &ProjectDocument::from(project))?;
        Ok(path)
    }

    pub fn write_structure_yaml(&self, files: &[FileSummary]) -> Result<PathBuf, IndexerError> {
        let path = self.output_dir.join("structure.yaml");
        let doc = StructureDocument {
            structure: build_structure(files),
        };
        write_yaml(&path, &doc)?;
        Ok(path)
    }

    pub fn write_file_yaml(&self, file: &FileNode) -> Result<PathBuf, IndexerError> {
        let path = self.file_yaml_path(&file.relative_path);
        write_yaml(&path, &FileDocument::from(file))?;
        Ok(path)
    }

    /// Delete a file's snapshot. Returns whether one existed.
    pub fn remove_file_yaml(&self, relative_path: &str) -> Result<bool, IndexerError> {
        let path = self.file_yaml_path(relative_path);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(value).map_err(|e| IndexerError::Yaml(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Read back a `project.yaml`.
pub fn read_project_yaml(path: &Path) -> Result<ProjectDocument, IndexerError> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| IndexerError::Yaml(e.to_string()))
}
