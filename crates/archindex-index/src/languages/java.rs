//! Java language extractor using tree-sitter-java.

use super::{
    children, clean_block_comment, decorator_name, end_line, named_children, node_text,
    signature_until_body, start_line,
};
use crate::extractor::LanguageExtractor;
use archindex_core::{ClassDef, FunctionDef, Parameter};
use tree_sitter::{Node, Tree};

const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Java language extractor for tree-sitter-based code indexing.
pub struct JavaExtractor;

impl JavaExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for JavaExtractor {
    fn language_name(&self) -> &str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn extract_functions(&self, tree: &Tree, source: &[u8]) -> Vec<FunctionDef> {
        let mut functions = Vec::new();
        collect_functions(tree.root_node(), source, None, &mut functions);
        functions
    }

    fn extract_classes(&self, tree: &Tree, source: &[u8]) -> Vec<ClassDef> {
        let mut classes = Vec::new();
        collect_classes(tree.root_node(), source, &mut classes);
        classes
    }
}

// ── Symbol Extraction ─────────────────────────────────────────────────────

fn collect_functions(
    node: Node,
    source: &[u8],
    parent_class: Option<&str>,
    functions: &mut Vec<FunctionDef>,
) {
    let kind = node.kind();
    if kind == "method_declaration" || kind == "constructor_declaration" {
        if let Some(func) = extract_method(node, source, parent_class) {
            functions.push(func);
        }
        // Local and anonymous classes inside the body.
        if let Some(body) = node.child_by_field_name("body") {
            collect_functions(body, source, None, functions);
        }
        return;
    }
    if TYPE_KINDS.contains(&kind) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, source));
        if let Some(body) = node.child_by_field_name("body") {
            collect_functions(body, source, name.as_deref(), functions);
        }
        return;
    }

    for child in children(node) {
        collect_functions(child, source, parent_class, functions);
    }
}

fn extract_method(node: Node, source: &[u8], parent_class: Option<&str>) -> Option<FunctionDef> {
    let name = node_text(node.child_by_field_name("name")?, source);

    let mut func = FunctionDef::new(name, start_line(node), end_line(node));
    func.signature = signature_until_body(node, node.child_by_field_name("body"), source);
    func.parameters = node
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();
    if node.kind() == "method_declaration" {
        func.return_type = node
            .child_by_field_name("type")
            .map(|t| node_text(t, source));
    }
    func.docstring = extract_javadoc(node, source);
    func.is_method = parent_class.is_some();
    func.parent_class = parent_class.map(str::to_string);
    func.decorators = annotations(node, source);
    Some(func)
}

fn extract_parameters(params: Node, source: &[u8]) -> Vec<Parameter> {
    let mut result = Vec::new();
    for child in named_children(params) {
        match child.kind() {
            "formal_parameter" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let mut param = Parameter::named(node_text(name, source));
                    param.type_annotation = child
                        .child_by_field_name("type")
                        .map(|t| node_text(t, source));
                    result.push(param);
                }
            }
            "spread_parameter" => {
                let parts = named_children(child);
                let name = parts
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"));
                if let Some(name) = name {
                    let mut param = Parameter::named(node_text(name, source));
                    param.type_annotation = parts
                        .iter()
                        .find(|c| !matches!(c.kind(), "modifiers" | "variable_declarator"))
                        .map(|t| node_text(*t, source));
                    param.is_variadic = true;
                    result.push(param);
                }
            }
            _ => {}
        }
    }
    result
}

fn collect_classes(node: Node, source: &[u8], classes: &mut Vec<ClassDef>) {
    if TYPE_KINDS.contains(&node.kind()) {
        if let Some(class) = extract_class(node, source) {
            classes.push(class);
        }
    }
    for child in children(node) {
        collect_classes(child, source, classes);
    }
}

fn extract_class(node: Node, source: &[u8]) -> Option<ClassDef> {
    let name = node_text(node.child_by_field_name("name")?, source);
    let mut class = ClassDef::new(name, start_line(node), end_line(node));

    for child in children(node) {
        match child.kind() {
            "superclass" => {
                class.parent_classes.extend(
                    named_children(child)
                        .into_iter()
                        .map(|t| type_name(t, source)),
                );
            }
            "super_interfaces" | "extends_interfaces" => {
                for list in named_children(child) {
                    if list.kind() == "type_list" {
                        class.parent_classes.extend(
                            named_children(list)
                                .into_iter()
                                .map(|t| type_name(t, source)),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        for member in named_children(body) {
            // Enum methods sit one level down.
            let members = if member.kind() == "enum_body_declarations" {
                named_children(member)
            } else {
                vec![member]
            };
            for m in members {
                if matches!(m.kind(), "method_declaration" | "constructor_declaration") {
                    if let Some(n) = m.child_by_field_name("name") {
                        class.method_names.push(node_text(n, source));
                    }
                }
            }
        }
    }

    class.docstring = extract_javadoc(node, source);
    class.decorators = annotations(node, source);
    Some(class)
}

// ── Helper Functions ──────────────────────────────────────────────────────

/// `List<String>` → `List`.
fn type_name(node: Node, source: &[u8]) -> String {
    let text = node_text(node, source);
    text.split('<').next().unwrap_or(&text).trim().to_string()
}

fn annotations(node: Node, source: &[u8]) -> Vec<String> {
    children(node)
        .into_iter()
        .filter(|c| c.kind() == "modifiers")
        .flat_map(named_children)
        .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
        .map(|c| decorator_name(c, source))
        .collect()
}

fn extract_javadoc(node: Node, source: &[u8]) -> Option<String> {
    // Look for a block_comment (Javadoc) immediately preceding this node
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        match sibling.kind() {
            "block_comment" => {
                let text = node_text(sibling, source);
                if text.starts_with("/**") {
                    return clean_block_comment(&text);
                }
                return None;
            }
            "line_comment" => {
                // Skip line comments, look for Javadoc before them
                prev = sibling.prev_sibling();
                continue;
            }
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LanguageExtractor;
    use tree_sitter::Parser;

    fn parse_java(source: &str) -> Tree {
        let mut parser = Parser::new();
        let lang = tree_sitter_java::LANGUAGE;
        parser
            .set_language(&lang.into())
            .expect("failed to set Java language");
        parser
            .parse(source.as_bytes(), None)
            .expect("failed to parse")
    }

    const SOURCE: &str = r#"
package com.example;

/**
 * Manages users.
 */
@Service
public class UserService extends BaseService<User> implements Closeable, Auditable {
    private final Repo repo;

    public UserService(Repo repo) {
        this.repo = repo;
    }

    /** Finds a user. */
    @Override
    public Optional<User> find(long id, String... fields) {
        return repo.find(id);
    }

    public void close() {}
}
"#;

    #[test]
    fn extract_java_class() {
        let tree = parse_java(SOURCE);
        let classes = JavaExtractor::new().extract_classes(&tree, SOURCE.as_bytes());
        assert_eq!(classes.len(), 1);
        let svc = &classes[0];
        assert_eq!(svc.name, "UserService");
        assert_eq!(svc.parent_classes, vec!["BaseService", "Closeable", "Auditable"]);
        assert_eq!(svc.method_names, vec!["UserService", "find", "close"]);
        assert_eq!(svc.docstring.as_deref(), Some("Manages users."));
        assert_eq!(svc.decorators, vec!["Service"]);
    }

    #[test]
    fn extract_java_methods() {
        let tree = parse_java(SOURCE);
        let funcs = JavaExtractor::new().extract_functions(&tree, SOURCE.as_bytes());
        assert_eq!(funcs.len(), 3);
        assert!(funcs
            .iter()
            .all(|f| f.is_method && f.parent_class.as_deref() == Some("UserService")));

        let ctor = &funcs[0];
        assert_eq!(ctor.name, "UserService");
        assert!(ctor.return_type.is_none());
        assert_eq!(ctor.parameters[0].type_annotation.as_deref(), Some("Repo"));

        let find = &funcs[1];
        assert_eq!(find.return_type.as_deref(), Some("Optional<User>"));
        assert_eq!(find.docstring.as_deref(), Some("Finds a user."));
        assert_eq!(find.decorators, vec!["Override"]);
        assert_eq!(find.parameters.len(), 2);
        assert_eq!(find.parameters[0].name, "id");
        assert_eq!(find.parameters[1].name, "fields");
        assert!(find.parameters[1].is_variadic);
        assert!(find
            .signature
            .ends_with("Optional<User> find(long id, String... fields)"));
    }

    #[test]
    fn interface_and_enum() {
        let source = r#"
interface Shape extends Comparable<Shape> {
    double area();
}

enum Color implements Named {
    RED, GREEN;

    public String label() { return name(); }
}
"#;
        let tree = parse_java(source);
        let extractor = JavaExtractor::new();
        let classes = extractor.extract_classes(&tree, source.as_bytes());
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].name, "Shape");
        assert_eq!(classes[0].parent_classes, vec!["Comparable"]);
        assert_eq!(classes[0].method_names, vec!["area"]);
        assert_eq!(classes[1].name, "Color");
        assert_eq!(classes[1].parent_classes, vec!["Named"]);
        assert_eq!(classes[1].method_names, vec!["label"]);

        let funcs = extractor.extract_functions(&tree, source.as_bytes());
        let area = funcs.iter().find(|f| f.name == "area").unwrap();
        assert_eq!(area.signature, "double area()");
        assert_eq!(area.parent_class.as_deref(), Some("Shape"));
    }
}
