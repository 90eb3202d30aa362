//! Language registry for code indexing.
//!
//! Each language implements the `LanguageExtractor` trait and is registered here.

mod ecmascript;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod typescript;

use crate::extractor::LanguageExtractor;
use tree_sitter::Node;

/// Returns all available language extractors.
pub fn all_extractors() -> Vec<Box<dyn LanguageExtractor>> {
    vec![
        Box::new(python::PythonExtractor::new()),
        Box::new(javascript::JavaScriptExtractor::new()),
        Box::new(typescript::TypeScriptExtractor::typescript()),
        Box::new(typescript::TypeScriptExtractor::tsx()),
        Box::new(go::GoExtractor::new()),
        Box::new(java::JavaExtractor::new()),
    ]
}

/// Find an extractor by language name.
pub fn extractor_for_language(language: &str) -> Option<Box<dyn LanguageExtractor>> {
    all_extractors()
        .into_iter()
        .find(|extractor| extractor.language_name() == language)
}

/// Find an extractor for a given file extension.
pub fn extractor_for_extension(ext: &str) -> Option<Box<dyn LanguageExtractor>> {
    let ext = ext.to_ascii_lowercase();
    all_extractors()
        .into_iter()
        .find(|extractor| extractor.file_extensions().contains(&ext.as_str()))
}

// ── Shared Helpers ────────────────────────────────────────────────────────

pub(crate) fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

pub(crate) fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// 1-based start line.
pub(crate) fn start_line(node: Node) -> usize {
    node.start_position().row + 1
}

/// 1-based end line.
pub(crate) fn end_line(node: Node) -> usize {
    node.end_position().row + 1
}

pub(crate) fn has_child_kind(node: Node, kind: &str) -> bool {
    children(node).iter().any(|c| c.kind() == kind)
}

/// Source text of `node` up to where `body` starts, whitespace collapsed.
///
/// Without a body (abstract/interface members, expression-bodied arrows)
/// falls back to the text before the first `{`, or the first line.
pub(crate) fn signature_until_body(node: Node, body: Option<Node>, source: &[u8]) -> String {
    // Leading decorators are reported separately.
    let start = children(node)
        .into_iter()
        .find(|c| !matches!(c.kind(), "decorator" | "comment"))
        .map(|c| c.start_byte())
        .unwrap_or_else(|| node.start_byte());
    let raw = match body {
        Some(body) if body.start_byte() > start => {
            String::from_utf8_lossy(&source[start..body.start_byte()]).into_owned()
        }
        _ => {
            let text = node_text(node, source);
            match text.find('{') {
                Some(pos) => text[..pos].to_string(),
                None => text.lines().next().unwrap_or("").to_string(),
            }
        }
    };
    collapse_whitespace(raw.trim().trim_end_matches(';'))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip `/** ... */` delimiters and leading `*` from each line.
pub(crate) fn clean_block_comment(raw: &str) -> Option<String> {
    let trimmed = raw
        .strip_prefix("/**")
        .or_else(|| raw.strip_prefix("/*"))
        .unwrap_or(raw);
    let trimmed = trimmed.strip_suffix("*/").unwrap_or(trimmed);

    let mut lines: Vec<&str> = trimmed
        .lines()
        .map(|line| {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("* ") {
                rest
            } else if let Some(rest) = line.strip_prefix('*') {
                rest
            } else {
                line
            }
        })
        .collect();

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n").trim_end().to_string())
    }
}

/// Decorator/annotation text without the leading `@`.
pub(crate) fn decorator_name(node: Node, source: &[u8]) -> String {
    node_text(node, source)
        .trim()
        .trim_start_matches('@')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_python_extractor() {
        let ext = extractor_for_extension("py");
        assert!(ext.is_some());
        assert_eq!(ext.unwrap().language_name(), "python");
    }

    #[test]
    fn finds_javascript_module_extensions() {
        for ext in ["js", "jsx", "mjs", "cjs"] {
            let found = extractor_for_extension(ext).unwrap();
            assert_eq!(found.language_name(), "javascript", "extension {ext}");
        }
    }

    #[test]
    fn typescript_and_tsx_are_distinct() {
        assert_eq!(
            extractor_for_extension("ts").unwrap().language_name(),
            "typescript"
        );
        assert_eq!(extractor_for_extension("tsx").unwrap().language_name(), "tsx");
    }

    #[test]
    fn finds_go_and_java_by_language() {
        assert!(extractor_for_language("go").is_some());
        assert!(extractor_for_language("java").is_some());
    }

    #[test]
    fn registry_agrees_with_extension_table() {
        for (ext, lang) in archindex_core::SUPPORTED_EXTENSIONS {
            let extractor = extractor_for_extension(ext).unwrap();
            assert_eq!(extractor.language_name(), *lang, "extension {ext}");
        }
    }

    #[test]
    fn returns_none_for_unknown() {
        assert!(extractor_for_extension("rs").is_none());
        assert!(extractor_for_language("cobol").is_none());
    }

    #[test]
    fn clean_block_comment_strips_stars() {
        let raw = "/**\n * Adds two numbers.\n *\n * @param a first\n */";
        assert_eq!(
            clean_block_comment(raw).as_deref(),
            Some("Adds two numbers.\n\n@param a first")
        );
        assert_eq!(clean_block_comment("/** */"), None);
    }

    #[test]
    fn collapse_whitespace_joins_lines() {
        assert_eq!(
            collapse_whitespace("func  Foo(\n\ta int,\n\tb int,\n)"),
            "func Foo( a int, b int, )"
        );
    }
}
