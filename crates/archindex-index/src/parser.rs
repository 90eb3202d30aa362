//! Tree-sitter parsing coordinator.
//!
//! Selects the registered extractor for a language, guards against binary and
//! mis-encoded input, and turns a source file into a [`FileNode`]. Parse
//! failures are contained in the returned node's `parse_status`; nothing here
//! returns an error for bad input.

use crate::extractor::LanguageExtractor;
use crate::hasher::content_hash;
use crate::languages;
use archindex_core::{FileNode, ParseStatus};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};
use uuid::Uuid;

/// How many leading bytes are checked for NUL when sniffing binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// Coordinates tree-sitter parsing across multiple languages.
pub struct CodeParser {
    extractors: Vec<Box<dyn LanguageExtractor>>,
}

impl CodeParser {
    /// Create a new CodeParser with all registered language extractors.
    pub fn new() -> Self {
        Self {
            extractors: languages::all_extractors(),
        }
    }

    /// A tree-sitter parser configured for `language`, or `None` if the
    /// language is not registered.
    pub fn get_parser(&self, language: &str) -> Option<Parser> {
        let extractor = self.find_extractor(language)?;
        let mut parser = Parser::new();
        match parser.set_language(&extractor.tree_sitter_language()) {
            Ok(()) => Some(parser),
            Err(err) => {
                tracing::warn!("Grammar for {} failed to load: {}", language, err);
                None
            }
        }
    }

    /// Parse source text into a syntax tree.
    pub fn parse(&self, source: &[u8], language: &str) -> Option<Tree> {
        self.get_parser(language)?.parse(source, None)
    }

    /// Names of all registered languages.
    pub fn supported_languages(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.language_name()).collect()
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.find_extractor(language).is_some()
    }

    /// Read and parse a file from disk.
    ///
    /// Returns `None` only when the language is unsupported or the file
    /// can't be read; every other outcome is a `FileNode`.
    pub fn parse_file(&self, path: &Path, relative_path: &str, language: &str) -> Option<FileNode> {
        if !self.supports_language(language) {
            return None;
        }
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", path.display(), err);
                return None;
            }
        };
        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        self.parse_source(relative_path, language, &content, last_modified)
    }

    /// Parse in-memory bytes as if they were the file at `relative_path`.
    pub fn parse_source(
        &self,
        relative_path: &str,
        language: &str,
        content: &[u8],
        last_modified: DateTime<Utc>,
    ) -> Option<FileNode> {
        let extractor = self.find_extractor(language)?;

        let mut node = FileNode {
            id: Uuid::new_v4(),
            project_id: None,
            relative_path: relative_path.to_string(),
            language: language.to_string(),
            content_hash: content_hash(content),
            size_bytes: content.len() as u64,
            last_modified,
            parse_status: ParseStatus::Success,
            error_message: None,
            functions: Vec::new(),
            classes: Vec::new(),
        };

        if is_binary(content) {
            tracing::debug!("Skipping binary file {}", relative_path);
            node.parse_status = ParseStatus::Skipped;
            node.error_message = Some("Binary content".to_string());
            return Some(node);
        }

        let text = decode(content);
        let source = text.as_bytes();

        let tree = match self.parse(source, language) {
            Some(tree) => tree,
            None => {
                node.parse_status = ParseStatus::Error;
                node.error_message = Some("Failed to parse AST".to_string());
                return Some(node);
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            tracing::debug!("Syntax error in {} near line {}", relative_path, line);
            node.parse_status = ParseStatus::Error;
            node.error_message = Some(format!("Syntax error near line {line}"));
            return Some(node);
        }

        node.functions = extractor.extract_functions(&tree, source);
        node.classes = extractor.extract_classes(&tree, source);
        Some(node)
    }

    fn find_extractor(&self, language: &str) -> Option<&dyn LanguageExtractor> {
        self.extractors
            .iter()
            .find(|e| e.language_name() == language)
            .map(|e| e.as_ref())
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A NUL byte in the first 8 KiB marks the content as binary.
pub fn is_binary(content: &[u8]) -> bool {
    content
        .iter()
        .take(BINARY_SNIFF_LEN)
        .any(|&b| b == 0)
}

/// UTF-8 when valid, otherwise Latin-1 transcoded to UTF-8.
fn decode(content: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(content) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(content.iter().map(|&b| b as char).collect()),
    }
}

/// 1-based line of the first ERROR or MISSING node, depth-first.
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_line)
}
