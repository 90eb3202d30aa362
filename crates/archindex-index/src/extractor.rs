//! LanguageExtractor trait for per-language symbol extraction from tree-sitter ASTs.

use archindex_core::{ClassDef, FunctionDef};

/// Trait for per-language symbol extraction from tree-sitter ASTs.
///
/// Each language implements this trait and is registered in
/// [`crate::languages::all_extractors`]; adding a language never touches the
/// parser itself.
pub trait LanguageExtractor: Send + Sync {
    /// Returns the language name used throughout the index (e.g. "python").
    fn language_name(&self) -> &str;

    /// Returns the file extensions this extractor handles (e.g. &["py"]).
    fn file_extensions(&self) -> &[&str];

    /// Returns the tree-sitter Language for configuring the parser.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Extract every function and method definition, in source order.
    fn extract_functions(&self, tree: &tree_sitter::Tree, source: &[u8]) -> Vec<FunctionDef>;

    /// Extract every class-like definition, in source order.
    fn extract_classes(&self, tree: &tree_sitter::Tree, source: &[u8]) -> Vec<ClassDef>;
}
