//! Scan-and-parse orchestration.
//!
//! Walks a [`Scanner`], hashes each file, and parses it with the
//! [`CodeParser`]. Storage and YAML output are left to the caller.

use crate::hasher::file_hash;
use crate::parser::CodeParser;
use crate::scanner::{ScannedFile, Scanner};
use archindex_core::{FileNode, ParseStatus};
use std::collections::{BTreeMap, HashMap};

/// Result of parsing a set of files.
#[derive(Debug, Default)]
pub struct IndexResult {
    /// Files handed to the parser.
    pub files_scanned: usize,
    /// Files parsed with `ParseStatus::Success`.
    pub files_parsed: usize,
    /// Binary files tracked but not parsed.
    pub files_skipped: usize,
    /// Files that failed to parse (syntax errors and the like).
    pub files_failed: usize,
    pub total_symbols: usize,
    /// `path: message` for every unreadable or unparseable file.
    pub errors: Vec<String>,
    /// One node per readable file, in scan order.
    pub files: Vec<FileNode>,
}

/// Current on-disk state of a project: content hashes plus the scanned
/// entries they belong to, both keyed by relative path.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub hashes: HashMap<String, String>,
    pub files: BTreeMap<String, ScannedFile>,
}

pub struct Indexer {
    parser: CodeParser,
}

impl Indexer {
    pub fn new() -> Self {
        Self {
            parser: CodeParser::new(),
        }
    }

    pub fn parser(&self) -> &CodeParser {
        &self.parser
    }

    /// Parse every file the scanner yields.
    pub fn index_directory(&self, scanner: &Scanner) -> IndexResult {
        self.index_files(scanner.scan(), |_| {})
    }

    /// Parse `files` one at a time, calling `on_file` after each.
    ///
    /// A single file's failure is recorded in the result and never stops
    /// the run.
    pub fn index_files<I, F>(&self, files: I, mut on_file: F) -> IndexResult
    where
        I: IntoIterator<Item = ScannedFile>,
        F: FnMut(&FileNode),
    {
        let mut result = IndexResult::default();

        for scanned in files {
            result.files_scanned += 1;
            let Some(node) =
                self.parser
                    .parse_file(&scanned.path, &scanned.relative_path, &scanned.language)
            else {
                result
                    .errors
                    .push(format!("{}: unreadable", scanned.relative_path));
                continue;
            };

            match node.parse_status {
                ParseStatus::Success => result.files_parsed += 1,
                ParseStatus::Skipped => result.files_skipped += 1,
                ParseStatus::Error => {
                    result.files_failed += 1;
                    let message = node.error_message.as_deref().unwrap_or("parse error");
                    tracing::warn!("Failed to parse {}: {}", scanned.relative_path, message);
                    result
                        .errors
                        .push(format!("{}: {}", scanned.relative_path, message));
                }
            }
            result.total_symbols += node.symbol_count();
            on_file(&node);
            result.files.push(node);
        }

        tracing::debug!(
            "Parsed {} files: {} ok, {} skipped, {} failed, {} symbols",
            result.files_scanned,
            result.files_parsed,
            result.files_skipped,
            result.files_failed,
            result.total_symbols,
        );
        result
    }

    /// Hash every file the scanner yields without parsing.
    pub fn snapshot(&self, scanner: &Scanner) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for scanned in scanner.scan() {
            let Some(hash) = file_hash(&scanned.path) else {
                continue;
            };
            snapshot
                .hashes
                .insert(scanned.relative_path.clone(), hash);
            snapshot
                .files
                .insert(scanned.relative_path.clone(), scanned);
        }
        snapshot
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::content_hash;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(
            dir.path().join("pkg/models.py"),
            "class Base:\n    pass\n\nclass User(Base):\n    def save(self):\n        pass\n",
        )
        .unwrap();
        fs::write(dir.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
        fs::write(dir.path().join("broken.py"), "def oops(:\n").unwrap();
        fs::write(dir.path().join("README.md"), "# readme\n").unwrap();
        dir
    }

    #[test]
    fn index_directory_parses_supported_files() {
        let dir = fixture();
        let scanner = Scanner::new(dir.path(), &[], 1024 * 1024);
        let result = Indexer::new().index_directory(&scanner);

        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.files_parsed, 2);
        assert_eq!(result.files_failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("broken.py:"));
        // Base, User, save, main
        assert_eq!(result.total_symbols, 4);
        let paths: Vec<_> = result.files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["broken.py", "main.go", "pkg/models.py"]);
    }

    #[test]
    fn index_files_reports_each_node() {
        let dir = fixture();
        let scanner = Scanner::new(dir.path(), &["broken.py".to_string()], 1024 * 1024);
        let mut seen = Vec::new();
        let result = Indexer::new().index_files(scanner.scan(), |node| {
            seen.push(node.relative_path.clone())
        });
        assert_eq!(seen, vec!["main.go", "pkg/models.py"]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn snapshot_hashes_raw_bytes() {
        let dir = fixture();
        let scanner = Scanner::new(dir.path(), &[], 1024 * 1024);
        let snapshot = Indexer::new().snapshot(&scanner);

        assert_eq!(snapshot.hashes.len(), 3);
        assert_eq!(
            snapshot.hashes["main.go"],
            content_hash(b"package main\n\nfunc main() {}\n")
        );
        assert_eq!(snapshot.files["pkg/models.py"].language, "python");
    }
}
