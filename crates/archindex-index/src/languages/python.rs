//! Python language extractor using tree-sitter-python.

use super::{
    children, decorator_name, end_line, has_child_kind, named_children, node_text, start_line,
};
use crate::extractor::LanguageExtractor;
use archindex_core::{ClassDef, FunctionDef, Parameter};
use tree_sitter::{Node, Tree};

/// Python language extractor for tree-sitter-based code indexing.
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language_name(&self) -> &str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
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

// ── Function Extraction ───────────────────────────────────────────────────

fn collect_functions(
    node: Node,
    source: &[u8],
    parent_class: Option<&str>,
    functions: &mut Vec<FunctionDef>,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(func) = extract_function(node, source, parent_class) {
                functions.push(func);
            }
            // Nested defs are plain functions, not methods of the outer class.
            if let Some(body) = node.child_by_field_name("body") {
                collect_functions(body, source, None, functions);
            }
            return;
        }
        "class_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, source));
            if let Some(body) = node.child_by_field_name("body") {
                collect_functions(body, source, name.as_deref(), functions);
            }
            return;
        }
        _ => {}
    }

    for child in children(node) {
        collect_functions(child, source, parent_class, functions);
    }
}

fn extract_function(node: Node, source: &[u8], parent_class: Option<&str>) -> Option<FunctionDef> {
    let name = node_text(node.child_by_field_name("name")?, source);
    if name.is_empty() {
        return None;
    }

    let is_async = has_child_kind(node, "async");
    let params = node
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();
    let return_type = node
        .child_by_field_name("return_type")
        .map(|n| node_text(n, source));

    let rendered: Vec<&str> = params.iter().map(|(text, _)| text.as_str()).collect();
    let mut signature = format!("def {}({})", name, rendered.join(", "));
    if let Some(ret) = &return_type {
        signature.push_str(" -> ");
        signature.push_str(ret);
    }
    if is_async {
        signature.insert_str(0, "async ");
    }

    let mut func = FunctionDef::new(name, start_line(node), end_line(node));
    func.signature = signature;
    func.parameters = params.into_iter().map(|(_, p)| p).collect();
    func.return_type = return_type;
    func.docstring = extract_docstring(node, source);
    func.is_async = is_async;
    func.is_method = parent_class.is_some();
    func.parent_class = parent_class.map(str::to_string);
    func.decorators = decorators_of(node, source);
    Some(func)
}

/// Parameters in declaration order, excluding `self`/`cls`, each paired with
/// its rendering for the signature.
fn extract_parameters(params: Node, source: &[u8]) -> Vec<(String, Parameter)> {
    let mut result = Vec::new();

    for child in named_children(params) {
        let parsed = match child.kind() {
            "identifier" => Some(("", Parameter::named(node_text(child, source)))),
            "typed_parameter" => typed_parameter(child, source),
            "default_parameter" | "typed_default_parameter" => {
                child.child_by_field_name("name").map(|name_node| {
                    let mut param = Parameter::named(node_text(name_node, source));
                    param.type_annotation = child
                        .child_by_field_name("type")
                        .map(|t| node_text(t, source));
                    param.default = child
                        .child_by_field_name("value")
                        .map(|v| node_text(v, source));
                    ("", param)
                })
            }
            "list_splat_pattern" => splat_parameter(child, source, "*"),
            "dictionary_splat_pattern" => splat_parameter(child, source, "**"),
            _ => None,
        };

        let Some((prefix, param)) = parsed else {
            continue;
        };
        if !param.is_variadic && (param.name == "self" || param.name == "cls") {
            continue;
        }
        result.push((render_parameter(prefix, &param), param));
    }

    result
}

fn typed_parameter<'a>(node: Node, source: &[u8]) -> Option<(&'a str, Parameter)> {
    let type_annotation = node
        .child_by_field_name("type")
        .map(|t| node_text(t, source));
    let target = named_children(node)
        .into_iter()
        .find(|c| c.kind() != "type")?;

    let (prefix, mut param) = match target.kind() {
        "identifier" => ("", Parameter::named(node_text(target, source))),
        "list_splat_pattern" => splat_parameter(target, source, "*")?,
        "dictionary_splat_pattern" => splat_parameter(target, source, "**")?,
        _ => return None,
    };
    param.type_annotation = type_annotation;
    Some((prefix, param))
}

fn splat_parameter<'a>(node: Node, source: &[u8], prefix: &'a str) -> Option<(&'a str, Parameter)> {
    let ident = named_children(node)
        .into_iter()
        .find(|c| c.kind() == "identifier")?;
    let mut param = Parameter::named(node_text(ident, source));
    param.is_variadic = true;
    Some((prefix, param))
}

fn render_parameter(prefix: &str, param: &Parameter) -> String {
    let mut text = format!("{}{}", prefix, param.name);
    if let Some(t) = &param.type_annotation {
        text.push_str(": ");
        text.push_str(t);
    }
    if let Some(d) = &param.default {
        text.push_str(" = ");
        text.push_str(d);
    }
    text
}

// ── Class Extraction ──────────────────────────────────────────────────────

fn collect_classes(node: Node, source: &[u8], classes: &mut Vec<ClassDef>) {
    if node.kind() == "class_definition" {
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
    if name.is_empty() {
        return None;
    }

    let mut class = ClassDef::new(name, start_line(node), end_line(node));

    if let Some(supers) = node.child_by_field_name("superclasses") {
        class.parent_classes = named_children(supers)
            .into_iter()
            .filter(|c| matches!(c.kind(), "identifier" | "attribute"))
            .map(|c| node_text(c, source))
            .collect();
    }

    if let Some(body) = node.child_by_field_name("body") {
        for stmt in named_children(body) {
            let def = match stmt.kind() {
                "function_definition" => Some(stmt),
                "decorated_definition" => stmt
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition"),
                _ => None,
            };
            if let Some(name) = def.and_then(|d| d.child_by_field_name("name")) {
                class.method_names.push(node_text(name, source));
            }
        }
    }

    class.docstring = extract_docstring(node, source);
    class.decorators = decorators_of(node, source);
    Some(class)
}

// ── Helper Functions ──────────────────────────────────────────────────────

/// Decorators live on the wrapping `decorated_definition`.
fn decorators_of(node: Node, source: &[u8]) -> Vec<String> {
    match node.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => named_children(parent)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .map(|c| decorator_name(c, source))
            .collect(),
        _ => Vec::new(),
    }
}

/// The leading string literal of a def/class body, unquoted.
fn extract_docstring(node: Node, source: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first_stmt = named_children(body)
        .into_iter()
        .find(|c| c.kind() != "comment")?;
    if first_stmt.kind() != "expression_statement" {
        return None;
    }
    let expr = first_stmt.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    unquote(&node_text(expr, source))
}

fn unquote(raw: &str) -> Option<String> {
    let text = raw.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })?;
    let inner = inner.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LanguageExtractor;
    use tree_sitter::Parser;

    fn parse_python(source: &str) -> Tree {
        let mut parser = Parser::new();
        let lang = tree_sitter_python::LANGUAGE;
        parser
            .set_language(&lang.into())
            .expect("failed to set Python language");
        parser
            .parse(source.as_bytes(), None)
            .expect("failed to parse")
    }

    fn functions(source: &str) -> Vec<FunctionDef> {
        let tree = parse_python(source);
        PythonExtractor::new().extract_functions(&tree, source.as_bytes())
    }

    fn classes(source: &str) -> Vec<ClassDef> {
        let tree = parse_python(source);
        PythonExtractor::new().extract_classes(&tree, source.as_bytes())
    }

    #[test]
    fn extract_typed_function() {
        let source = r#"
def add(a: int, b: int) -> int:
    """Adds two numbers."""
    return a + b
"#;
        let funcs = functions(source);
        assert_eq!(funcs.len(), 1);
        let add = &funcs[0];
        assert_eq!(add.name, "add");
        assert_eq!(add.line_number, 2);
        assert_eq!(add.end_line, 4);
        assert_eq!(add.parameters.len(), 2);
        assert_eq!(add.parameters[0].type_annotation.as_deref(), Some("int"));
        assert_eq!(add.return_type.as_deref(), Some("int"));
        assert_eq!(add.signature, "def add(a: int, b: int) -> int");
        assert_eq!(add.docstring.as_deref(), Some("Adds two numbers."));
        assert!(!add.is_method);
    }

    #[test]
    fn extract_defaults_and_splats() {
        let source = r#"
async def fetch(url, timeout: float = 5.0, retries=3, *args, **kwargs):
    pass
"#;
        let funcs = functions(source);
        let fetch = &funcs[0];
        assert!(fetch.is_async);
        let names: Vec<_> = fetch.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["url", "timeout", "retries", "args", "kwargs"]);

        let timeout = &fetch.parameters[1];
        assert_eq!(timeout.type_annotation.as_deref(), Some("float"));
        assert_eq!(timeout.default.as_deref(), Some("5.0"));
        assert_eq!(fetch.parameters[2].default.as_deref(), Some("3"));
        assert!(fetch.parameters[3].is_variadic);
        assert!(fetch.parameters[4].is_variadic);
        assert_eq!(
            fetch.signature,
            "async def fetch(url, timeout: float = 5.0, retries = 3, *args, **kwargs)"
        );
    }

    #[test]
    fn methods_skip_self_and_track_class() {
        let source = r#"
class Dog(Animal):
    """A dog."""

    def __init__(self, name: str):
        self.name = name

    @classmethod
    def create(cls, name):
        return cls(name)

    @property
    def loud(self) -> str:
        return self.name.upper()
"#;
        let funcs = functions(source);
        assert_eq!(funcs.len(), 3);
        assert!(funcs.iter().all(|f| f.is_method));
        assert!(funcs.iter().all(|f| f.parent_class.as_deref() == Some("Dog")));

        let init = &funcs[0];
        assert_eq!(init.parameters.len(), 1);
        assert_eq!(init.parameters[0].name, "name");

        let create = &funcs[1];
        assert_eq!(create.decorators, vec!["classmethod"]);
        assert_eq!(create.parameters.len(), 1);

        let loud = &funcs[2];
        assert!(loud.parameters.is_empty());
        assert_eq!(loud.signature, "def loud() -> str");
    }

    #[test]
    fn extract_class_with_parent_and_methods() {
        let source = r#"
@dataclass
class Dog(base.Animal, Serializable):
    '''A dog class.'''

    def bark(self):
        return "Woof!"

    @staticmethod
    def species():
        return "canis"
"#;
        let found = classes(source);
        assert_eq!(found.len(), 1);
        let dog = &found[0];
        assert_eq!(dog.name, "Dog");
        assert_eq!(dog.parent_classes, vec!["base.Animal", "Serializable"]);
        assert_eq!(dog.docstring.as_deref(), Some("A dog class."));
        assert_eq!(dog.method_names, vec!["bark", "species"]);
        assert_eq!(dog.decorators, vec!["dataclass"]);
    }

    #[test]
    fn nested_function_is_not_a_method() {
        let source = r#"
class Outer:
    def method(self):
        def helper(x):
            return x
        return helper(1)
"#;
        let funcs = functions(source);
        let helper = funcs.iter().find(|f| f.name == "helper").unwrap();
        assert!(!helper.is_method);
        assert!(helper.parent_class.is_none());
        let method = funcs.iter().find(|f| f.name == "method").unwrap();
        assert_eq!(method.parent_class.as_deref(), Some("Outer"));
    }

    #[test]
    fn nested_class_tracks_innermost_class() {
        let source = r#"
class Outer:
    class Inner:
        def inner_method(self):
            pass
"#;
        let found = classes(source);
        assert_eq!(found.len(), 2);
        let funcs = functions(source);
        assert_eq!(funcs[0].parent_class.as_deref(), Some("Inner"));
    }

    #[test]
    fn single_quoted_docstring_and_multiline() {
        let source = r#"
def a():
    'short'

def b():
    """
    First line.
    Second line.
    """
    pass

def c():
    x = "not a docstring"
"#;
        let funcs = functions(source);
        assert_eq!(funcs[0].docstring.as_deref(), Some("short"));
        let doc = funcs[1].docstring.as_deref().unwrap();
        assert!(doc.starts_with("First line."));
        assert!(doc.ends_with("Second line."));
        assert!(funcs[2].docstring.is_none());
    }

    #[test]
    fn unquote_handles_prefixes() {
        assert_eq!(unquote(r#"r"""raw doc""""#).as_deref(), Some("raw doc"));
        assert_eq!(unquote("''''''"), None);
    }
}
