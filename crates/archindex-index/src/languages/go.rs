//! Go language extractor using tree-sitter-go.
//!
//! Go has no classes; struct type declarations are reported as classes whose
//! methods are the receiver methods declared in the same file.

use super::{children, end_line, named_children, node_text, signature_until_body, start_line};
use crate::extractor::LanguageExtractor;
use archindex_core::{ClassDef, FunctionDef, Parameter};
use tree_sitter::{Node, Tree};

/// Go language extractor for tree-sitter-based code indexing.
pub struct GoExtractor;

impl GoExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for GoExtractor {
    fn language_name(&self) -> &str {
        "go"
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_go::LANGUAGE.into()
    }

    fn extract_functions(&self, tree: &Tree, source: &[u8]) -> Vec<FunctionDef> {
        let mut functions = Vec::new();
        collect_functions(tree.root_node(), source, &mut functions);
        functions
    }

    fn extract_classes(&self, tree: &Tree, source: &[u8]) -> Vec<ClassDef> {
        let mut classes = Vec::new();
        collect_structs(tree.root_node(), source, &mut classes);

        // Attach receiver methods, in declaration order.
        let methods: Vec<(String, String)> = self
            .extract_functions(tree, source)
            .into_iter()
            .filter_map(|f| f.parent_class.map(|recv| (recv, f.name)))
            .collect();
        for class in &mut classes {
            class.method_names = methods
                .iter()
                .filter(|(recv, _)| *recv == class.name)
                .map(|(_, name)| name.clone())
                .collect();
        }
        classes
    }
}

// ── Symbol Extraction ─────────────────────────────────────────────────────

fn collect_functions(node: Node, source: &[u8], functions: &mut Vec<FunctionDef>) {
    match node.kind() {
        "function_declaration" => {
            if let Some(func) = extract_function(node, source, None) {
                functions.push(func);
            }
            return;
        }
        "method_declaration" => {
            let receiver = receiver_type(node, source);
            if let Some(func) = extract_function(node, source, receiver) {
                functions.push(func);
            }
            return;
        }
        _ => {}
    }

    for child in children(node) {
        collect_functions(child, source, functions);
    }
}

fn extract_function(node: Node, source: &[u8], receiver: Option<String>) -> Option<FunctionDef> {
    let name = node_text(node.child_by_field_name("name")?, source);

    let mut func = FunctionDef::new(name, start_line(node), end_line(node));
    func.signature = signature_until_body(node, node.child_by_field_name("body"), source);
    func.parameters = node
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();
    func.return_type = node
        .child_by_field_name("result")
        .map(|r| node_text(r, source));
    func.docstring = extract_go_doc_comment(node, source);
    func.is_method = receiver.is_some();
    func.parent_class = receiver;
    Some(func)
}

fn extract_parameters(params: Node, source: &[u8]) -> Vec<Parameter> {
    let mut result = Vec::new();
    for decl in named_children(params) {
        let is_variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let type_annotation = decl
            .child_by_field_name("type")
            .map(|t| node_text(t, source));

        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| node_text(n, source))
            .collect();

        // `func(int, string)` declares unnamed parameters.
        let names = if names.is_empty() {
            vec!["_".to_string()]
        } else {
            names
        };
        for name in names {
            let mut param = Parameter::named(name);
            param.type_annotation = type_annotation.clone();
            param.is_variadic = is_variadic;
            result.push(param);
        }
    }
    result
}

fn collect_structs(node: Node, source: &[u8], classes: &mut Vec<ClassDef>) {
    if node.kind() == "type_declaration" {
        for spec in named_children(node) {
            if spec.kind() != "type_spec" {
                continue;
            }
            if let Some(class) = extract_struct(spec, node, source) {
                classes.push(class);
            }
        }
        return;
    }
    for child in children(node) {
        collect_structs(child, source, classes);
    }
}

fn extract_struct(spec: Node, decl: Node, source: &[u8]) -> Option<ClassDef> {
    let type_node = spec.child_by_field_name("type")?;
    if type_node.kind() != "struct_type" {
        return None;
    }
    let name = node_text(spec.child_by_field_name("name")?, source);

    let mut class = ClassDef::new(name, start_line(spec), end_line(spec));
    // Embedded fields are Go's closest thing to a parent class.
    if let Some(fields) = named_children(type_node)
        .into_iter()
        .find(|c| c.kind() == "field_declaration_list")
    {
        for field in named_children(fields) {
            if field.kind() != "field_declaration" || field.child_by_field_name("name").is_some() {
                continue;
            }
            if let Some(t) = field.child_by_field_name("type") {
                class
                    .parent_classes
                    .push(node_text(t, source).trim_start_matches('*').to_string());
            }
        }
    }
    class.docstring = extract_go_doc_comment(spec, source)
        .or_else(|| extract_go_doc_comment(decl, source));
    Some(class)
}

// ── Helper Functions ──────────────────────────────────────────────────────

fn extract_go_doc_comment(node: Node, source: &[u8]) -> Option<String> {
    let mut comment_lines = Vec::new();
    let mut prev = node.prev_sibling();

    while let Some(sibling) = prev {
        if sibling.kind() == "comment" {
            let text = node_text(sibling, source);
            if text.starts_with("//") {
                let stripped = text
                    .strip_prefix("// ")
                    .or_else(|| text.strip_prefix("//"))
                    .unwrap_or(&text);
                comment_lines.push(stripped.trim_end().to_string());
                prev = sibling.prev_sibling();
                continue;
            }
        }
        break;
    }

    comment_lines.reverse();
    if comment_lines.is_empty() {
        None
    } else {
        Some(comment_lines.join("\n"))
    }
}

/// `(s *Server)` → `Server`, `(l List[T])` → `List`.
fn receiver_type(node: Node, source: &[u8]) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    named_children(receiver)
        .into_iter()
        .filter(|c| c.kind() == "parameter_declaration")
        .find_map(|decl| decl.child_by_field_name("type"))
        .map(|t| {
            let text = node_text(t, source);
            let clean = text.trim_start_matches('*');
            clean.split('[').next().unwrap_or(clean).trim().to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LanguageExtractor;
    use tree_sitter::Parser;

    fn parse_go(source: &str) -> Tree {
        let mut parser = Parser::new();
        let lang = tree_sitter_go::LANGUAGE;
        parser
            .set_language(&lang.into())
            .expect("failed to set Go language");
        parser
            .parse(source.as_bytes(), None)
            .expect("failed to parse")
    }

    #[test]
    fn extract_go_function() {
        let source = r#"package main

// Add adds two integers.
func Add(a, b int) int {
	return a + b
}
"#;
        let tree = parse_go(source);
        let funcs = GoExtractor::new().extract_functions(&tree, source.as_bytes());

        assert_eq!(funcs.len(), 1);
        let add = &funcs[0];
        assert_eq!(add.name, "Add");
        assert_eq!(add.line_number, 4);
        assert_eq!(add.signature, "func Add(a, b int) int");
        assert_eq!(add.docstring.as_deref(), Some("Add adds two integers."));
        assert_eq!(add.return_type.as_deref(), Some("int"));
        let names: Vec<_> = add.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(add
            .parameters
            .iter()
            .all(|p| p.type_annotation.as_deref() == Some("int")));
        assert!(!add.is_method);
    }

    #[test]
    fn extract_go_method_and_variadic() {
        let source = r#"package main

type Server struct{}

// Start starts the server.
func (s *Server) Start(addrs ...string) error {
	return nil
}
"#;
        let tree = parse_go(source);
        let funcs = GoExtractor::new().extract_functions(&tree, source.as_bytes());

        let start = funcs.iter().find(|f| f.name == "Start").unwrap();
        assert!(start.is_method);
        assert_eq!(start.parent_class.as_deref(), Some("Server"));
        assert_eq!(start.parameters.len(), 1);
        assert!(start.parameters[0].is_variadic);
        assert_eq!(start.parameters[0].type_annotation.as_deref(), Some("string"));
    }

    #[test]
    fn structs_become_classes_with_receiver_methods() {
        let source = r#"package main

// Config holds settings.
type Config struct {
	Base
	*Logger
	Debug bool
	Port  int
}

type Reader interface {
	Read(p []byte) (n int, err error)
}

func (c *Config) Validate() error { return nil }
func (c Config) String() string { return "" }
func helper() {}
"#;
        let tree = parse_go(source);
        let classes = GoExtractor::new().extract_classes(&tree, source.as_bytes());

        assert_eq!(classes.len(), 1, "interfaces are not classes");
        let config = &classes[0];
        assert_eq!(config.name, "Config");
        assert_eq!(config.docstring.as_deref(), Some("Config holds settings."));
        assert_eq!(config.parent_classes, vec!["Base", "Logger"]);
        assert_eq!(config.method_names, vec!["Validate", "String"]);
    }

    #[test]
    fn generic_receiver_strips_type_parameters() {
        let source = r#"package list

type List[T any] struct { items []T }

func (l *List[T]) Len() int { return len(l.items) }
"#;
        let tree = parse_go(source);
        let funcs = GoExtractor::new().extract_functions(&tree, source.as_bytes());
        assert_eq!(funcs[0].parent_class.as_deref(), Some("List"));
    }
}
