//! archindex-index: scanning, hashing, tree-sitter symbol extraction and YAML
//! snapshots for the project architecture indexer.
//!
//! # Architecture
//!
//! - **scanner**: lazy, restartable directory walk with excludes, size limit and symlink-cycle guard
//! - **hasher**: SHA-256 content fingerprints and current-vs-stored diffing
//! - **parser**: tree-sitter coordinator that dispatches to language extractors
//! - **extractor**: trait for per-language function/class extraction
//! - **languages**: extractor registry (Python, JavaScript, TypeScript, TSX, Go, Java)
//! - **indexer**: scan + parse orchestration used by the index/update pipeline
//! - **yaml**: `project.yaml`, `structure.yaml` and per-file snapshots

pub mod extractor;
pub mod hasher;
pub mod indexer;
pub mod languages;
pub mod parser;
pub mod scanner;
pub mod yaml;

pub use extractor::LanguageExtractor;
pub use hasher::{compare, content_hash, file_hash, HashDiff};
pub use indexer::{IndexResult, Indexer, Snapshot};
pub use parser::{is_binary, CodeParser};
pub use scanner::{should_exclude, ExcludeSet, ScanIter, ScannedFile, Scanner};
pub use yaml::{
    build_structure, read_project_yaml, sanitize_path_for_filename, FileDocument, FileSummary,
    ProjectDocument, StructureDocument, YamlEmitter,
};
