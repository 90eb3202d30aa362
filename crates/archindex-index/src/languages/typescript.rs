//! TypeScript/TSX language extractor using tree-sitter-typescript.

use super::ecmascript;
use crate::extractor::LanguageExtractor;
use archindex_core::{ClassDef, FunctionDef};
use tree_sitter::Tree;

/// TypeScript extractor. `.ts` and `.tsx` use separate grammars because
/// type assertions (`<T>x`) and JSX are ambiguous between the two.
pub struct TypeScriptExtractor {
    tsx: bool,
}

impl TypeScriptExtractor {
    /// Plain `.ts` files.
    pub fn typescript() -> Self {
        Self { tsx: false }
    }

    /// `.tsx` files.
    pub fn tsx() -> Self {
        Self { tsx: true }
    }
}

impl Default for TypeScriptExtractor {
    fn default() -> Self {
        Self::typescript()
    }
}

impl LanguageExtractor for TypeScriptExtractor {
    fn language_name(&self) -> &str {
        if self.tsx {
            "tsx"
        } else {
            "typescript"
        }
    }

    fn file_extensions(&self) -> &[&str] {
        if self.tsx {
            &["tsx"]
        } else {
            &["ts"]
        }
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        if self.tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
    }

    fn extract_functions(&self, tree: &Tree, source: &[u8]) -> Vec<FunctionDef> {
        ecmascript::extract_functions(tree, source)
    }

    fn extract_classes(&self, tree: &Tree, source: &[u8]) -> Vec<ClassDef> {
        ecmascript::extract_classes(tree, source)
    }
}
