use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::IndexerError;

// ── Status Enums ────────────────────────────────────────────────────────────

/// Lifecycle state of an indexed project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Indexing,
    Active,
    Error,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indexing => write!(f, "indexing"),
            Self::Active => write!(f, "active"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "indexing" => Ok(Self::Indexing),
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            _ => Err(IndexerError::Validation(format!(
                "Invalid project status: {s}"
            ))),
        }
    }
}

/// Outcome of parsing a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Success,
    /// Not parsed at all (binary content).
    Skipped,
    Error,
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ParseStatus {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "skipped" => Ok(Self::Skipped),
            "error" => Ok(Self::Error),
            _ => Err(IndexerError::Validation(format!("Invalid parse status: {s}"))),
        }
    }
}

// ── Symbols ─────────────────────────────────────────────────────────────────

/// A single function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_annotation: Option<String>,
    pub default: Option<String>,
    /// `*args`, `**kwargs`, `...rest`, `String... values`.
    #[serde(default)]
    pub is_variadic: bool,
}

impl Parameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default: None,
            is_variadic: false,
        }
    }
}

/// A function or method definition extracted from source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: Uuid,
    pub name: String,
    /// 1-based line of the definition start.
    pub line_number: usize,
    /// 1-based line of the definition end.
    pub end_line: usize,
    /// Normalized, source-like signature text.
    pub signature: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub docstring: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_method: bool,
    /// Name of the innermost enclosing class (or Go receiver type).
    pub parent_class: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
}

impl FunctionDef {
    /// Create a function with only identity and location set.
    pub fn new(name: impl Into<String>, line_number: usize, end_line: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            line_number,
            end_line,
            signature: String::new(),
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            is_async: false,
            is_method: false,
            parent_class: None,
            decorators: Vec::new(),
        }
    }
}

/// A class definition extracted from source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: Uuid,
    pub name: String,
    pub line_number: usize,
    pub end_line: usize,
    #[serde(default)]
    pub parent_classes: Vec<String>,
    pub docstring: Option<String>,
    #[serde(default)]
    pub method_names: Vec<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, line_number: usize, end_line: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            line_number,
            end_line,
            parent_classes: Vec::new(),
            docstring: None,
            method_names: Vec::new(),
            decorators: Vec::new(),
        }
    }
}

// ── Files & Projects ────────────────────────────────────────────────────────

/// A source file within a project and the symbols extracted from it.
///
/// Identity for diffing is `relative_path`; content identity is `content_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub relative_path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub parse_status: ParseStatus,
    pub error_message: Option<String>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

impl FileNode {
    /// Number of symbols (functions + classes) in this file.
    pub fn symbol_count(&self) -> usize {
        self.functions.len() + self.classes.len()
    }
}

/// A codebase being indexed. One per indexed root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub root_path: String,
    pub status: ProjectStatus,
    pub file_count: usize,
    pub symbol_count: usize,
    pub indexed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl Project {
    /// A fresh project in the `indexing` state.
    pub fn new(name: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            root_path: root_path.into(),
            status: ProjectStatus::Indexing,
            file_count: 0,
            symbol_count: 0,
            indexed_at: None,
            config: BTreeMap::new(),
        }
    }

    /// Exclude patterns recorded at index time, if any.
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.config
            .get("exclude_patterns")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_exclude_patterns(&mut self, patterns: &[String]) {
        self.config.insert(
            "exclude_patterns".to_string(),
            serde_json::json!(patterns),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_roundtrip() {
        for status in [
            ProjectStatus::Indexing,
            ProjectStatus::Active,
            ProjectStatus::Error,
        ] {
            let parsed: ProjectStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("archived".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn parse_status_serializes_snake_case() {
        let json = serde_json::to_string(&ParseStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        let parsed: ParseStatus = "ERROR".parse().unwrap();
        assert_eq!(parsed, ParseStatus::Error);
    }

    #[test]
    fn parameter_type_field_is_named_type() {
        let param = Parameter {
            name: "a".into(),
            type_annotation: Some("int".into()),
            default: None,
            is_variadic: false,
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "int");
    }

    #[test]
    fn new_project_starts_indexing() {
        let project = Project::new("demo", "/opt/projects/demo");
        assert_eq!(project.status, ProjectStatus::Indexing);
        assert_eq!(project.file_count, 0);
        assert!(project.indexed_at.is_none());
    }

    #[test]
    fn exclude_patterns_stored_in_config() {
        let mut project = Project::new("demo", "/tmp/demo");
        assert!(project.exclude_patterns().is_empty());
        project.set_exclude_patterns(&["target/**".to_string(), "*.log".to_string()]);
        assert_eq!(project.exclude_patterns(), vec!["target/**", "*.log"]);
    }

    #[test]
    fn file_node_symbol_count() {
        let file = FileNode {
            id: Uuid::new_v4(),
            project_id: None,
            relative_path: "a.py".into(),
            language: "python".into(),
            content_hash: "0".repeat(64),
            size_bytes: 10,
            last_modified: Utc::now(),
            parse_status: ParseStatus::Success,
            error_message: None,
            functions: vec![FunctionDef::new("f", 1, 2), FunctionDef::new("g", 3, 4)],
            classes: vec![ClassDef::new("C", 5, 9)],
        };
        assert_eq!(file.symbol_count(), 3);
    }
}
