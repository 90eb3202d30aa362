//! Shared extraction for the JavaScript and TypeScript grammars.
//!
//! The TypeScript grammar is a superset of the JavaScript one, so a single
//! walker handles both; TS-only node kinds simply never occur in JS trees.

use super::{
    children, clean_block_comment, decorator_name, end_line, has_child_kind, named_children,
    node_text, signature_until_body, start_line,
};
use archindex_core::{ClassDef, FunctionDef, Parameter};
use tree_sitter::{Node, Tree};

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

pub(crate) fn extract_functions(tree: &Tree, source: &[u8]) -> Vec<FunctionDef> {
    let mut functions = Vec::new();
    collect_functions(tree.root_node(), source, None, &mut functions);
    functions
}

pub(crate) fn extract_classes(tree: &Tree, source: &[u8]) -> Vec<ClassDef> {
    let mut classes = Vec::new();
    collect_classes(tree.root_node(), source, &mut classes);
    classes
}

// ── Function Extraction ───────────────────────────────────────────────────

fn collect_functions(
    node: Node,
    source: &[u8],
    parent_class: Option<&str>,
    functions: &mut Vec<FunctionDef>,
) {
    let kind = node.kind();
    match kind {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = node_text(name, source);
                functions.push(build_function(node, node, name, None, source));
            }
            recurse_body(node, source, functions);
            return;
        }
        "method_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let name = node_text(name, source);
                functions.push(build_function(node, node, name, parent_class, source));
            }
            recurse_body(node, source, functions);
            return;
        }
        "arrow_function" | "function_expression" | "function" => {
            // Only named bindings count; anonymous callbacks are skipped.
            if let Some((anchor, name, is_field)) = assigned_name(node, source) {
                let owner = if is_field { parent_class } else { None };
                functions.push(build_function(node, anchor, name, owner, source));
            }
            recurse_body(node, source, functions);
            return;
        }
        _ if CLASS_KINDS.contains(&kind) => {
            let name = class_name(node, source);
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

fn recurse_body(node: Node, source: &[u8], functions: &mut Vec<FunctionDef>) {
    if let Some(body) = node.child_by_field_name("body") {
        collect_functions(body, source, None, functions);
    }
}

/// Name a function expression takes from its binding: `const f = () => {}`
/// or a class field `handler = () => {}`.
///
/// Returns the node the signature starts from, the name, and whether the
/// binding is a class field.
fn assigned_name<'t>(node: Node<'t>, source: &[u8]) -> Option<(Node<'t>, String, bool)> {
    let parent = node.parent()?;
    let (name_node, is_field) = match parent.kind() {
        "variable_declarator" => (parent.child_by_field_name("name")?, false),
        "public_field_definition" => (parent.child_by_field_name("name")?, true),
        "field_definition" => (parent.child_by_field_name("property")?, true),
        _ => return None,
    };
    if parent.child_by_field_name("value") != Some(node) {
        return None;
    }
    if !matches!(
        name_node.kind(),
        "identifier" | "property_identifier" | "private_property_identifier"
    ) {
        return None;
    }
    Some((parent, node_text(name_node, source), is_field))
}

fn build_function(
    node: Node,
    anchor: Node,
    name: String,
    parent_class: Option<&str>,
    source: &[u8],
) -> FunctionDef {
    let body = node.child_by_field_name("body");
    // Expression-bodied arrows have no block; stop at the expression.
    let signature = signature_until_body(anchor, body, source);

    let mut func = FunctionDef::new(name, start_line(anchor), end_line(node));
    func.signature = signature;
    func.parameters = extract_parameters(node, source);
    func.return_type = node
        .child_by_field_name("return_type")
        .map(|t| strip_type_colon(&node_text(t, source)));
    func.is_async = has_child_kind(node, "async");
    func.is_method = parent_class.is_some();
    func.parent_class = parent_class.map(str::to_string);
    func.docstring = jsdoc_for(doc_anchor(anchor), source);
    func.decorators = decorators_of(anchor, source);
    func
}

fn extract_parameters(node: Node, source: &[u8]) -> Vec<Parameter> {
    let Some(params) = node.child_by_field_name("parameters") else {
        // `x => x * 2`
        return node
            .child_by_field_name("parameter")
            .map(|p| vec![Parameter::named(node_text(p, source))])
            .unwrap_or_default();
    };

    let mut result = Vec::new();
    for child in named_children(params) {
        match child.kind() {
            "identifier" | "object_pattern" | "array_pattern" => {
                result.push(Parameter::named(node_text(child, source)));
            }
            "assignment_pattern" => {
                if let Some(left) = child.child_by_field_name("left") {
                    let mut param = Parameter::named(node_text(left, source));
                    param.default = child
                        .child_by_field_name("right")
                        .map(|r| node_text(r, source));
                    result.push(param);
                }
            }
            "rest_pattern" => result.push(rest_parameter(child, source)),
            "required_parameter" | "optional_parameter" => {
                let Some(pattern) = child.child_by_field_name("pattern") else {
                    continue;
                };
                let mut param = if pattern.kind() == "rest_pattern" {
                    rest_parameter(pattern, source)
                } else {
                    Parameter::named(node_text(pattern, source))
                };
                param.type_annotation = child
                    .child_by_field_name("type")
                    .map(|t| strip_type_colon(&node_text(t, source)));
                param.default = child
                    .child_by_field_name("value")
                    .map(|v| node_text(v, source));
                result.push(param);
            }
            _ => {}
        }
    }
    result
}

fn rest_parameter(node: Node, source: &[u8]) -> Parameter {
    let mut param = Parameter::named(node_text(node, source).trim_start_matches("...").trim());
    param.is_variadic = true;
    param
}

fn strip_type_colon(text: &str) -> String {
    text.trim().trim_start_matches(':').trim().to_string()
}

// ── Class Extraction ──────────────────────────────────────────────────────

fn collect_classes(node: Node, source: &[u8], classes: &mut Vec<ClassDef>) {
    if CLASS_KINDS.contains(&node.kind()) {
        if let Some(class) = extract_class(node, source) {
            classes.push(class);
        }
    }
    for child in children(node) {
        collect_classes(child, source, classes);
    }
}

fn class_name(node: Node, source: &[u8]) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, source));
    }
    // `const Foo = class { ... }`
    let parent = node.parent()?;
    if parent.kind() == "variable_declarator" {
        return parent
            .child_by_field_name("name")
            .map(|n| node_text(n, source));
    }
    None
}

fn extract_class(node: Node, source: &[u8]) -> Option<ClassDef> {
    let name = class_name(node, source)?;
    let anchor = match node.parent() {
        Some(p) if node.kind() == "class" && p.kind() == "variable_declarator" => p,
        _ => node,
    };

    let mut class = ClassDef::new(name, start_line(node), end_line(node));

    if let Some(heritage) = children(node)
        .into_iter()
        .find(|c| c.kind() == "class_heritage")
    {
        heritage_names(heritage, source, &mut class.parent_classes);
    }

    if let Some(body) = node.child_by_field_name("body") {
        for member in named_children(body) {
            let name = match member.kind() {
                "method_definition" => member.child_by_field_name("name"),
                "public_field_definition" | "field_definition" => {
                    let is_fn = member
                        .child_by_field_name("value")
                        .is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"));
                    if is_fn {
                        member
                            .child_by_field_name("name")
                            .or_else(|| member.child_by_field_name("property"))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(n) = name {
                class.method_names.push(node_text(n, source));
            }
        }
    }

    class.docstring = jsdoc_for(doc_anchor(anchor), source);
    class.decorators = decorators_of(node, source);
    Some(class)
}

/// `extends A implements B, C` → `["A", "B", "C"]`, type arguments dropped.
fn heritage_names(node: Node, source: &[u8], out: &mut Vec<String>) {
    for child in named_children(node) {
        match child.kind() {
            "extends_clause" | "implements_clause" => heritage_names(child, source, out),
            "type_arguments" | "comment" => {}
            _ => {
                let text = node_text(child, source);
                let base = text.split('<').next().unwrap_or("").trim();
                if !base.is_empty() {
                    out.push(base.to_string());
                }
            }
        }
    }
}

// ── Helper Functions ──────────────────────────────────────────────────────

/// The statement a leading comment would be attached to.
fn doc_anchor(node: Node) -> Node {
    let mut current = node;
    if current.kind() == "variable_declarator" {
        if let Some(decl) = current.parent() {
            current = decl;
        }
    }
    match current.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => current,
    }
}

/// JSDoc (`/** ... */`) immediately preceding a node, skipping decorators.
fn jsdoc_for(node: Node, source: &[u8]) -> Option<String> {
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        match sibling.kind() {
            "comment" => {
                let text = node_text(sibling, source);
                return if text.starts_with("/**") {
                    clean_block_comment(&text)
                } else {
                    None
                };
            }
            "decorator" => prev = sibling.prev_sibling(),
            _ => return None,
        }
    }
    None
}

/// Decorators on the node itself, those preceding it as siblings (TS class
/// members), and those on a wrapping `export` statement.
fn decorators_of(node: Node, source: &[u8]) -> Vec<String> {
    let mut leading = Vec::new();
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev.filter(|s| s.kind() == "decorator") {
        leading.push(decorator_name(sibling, source));
        prev = sibling.prev_sibling();
    }
    leading.reverse();

    let mut decorators = leading;
    decorators.extend(
        children(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .map(|c| decorator_name(c, source)),
    );
    if let Some(parent) = node.parent() {
        if parent.kind() == "export_statement" {
            decorators.extend(
                children(parent)
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .map(|c| decorator_name(c, source)),
            );
        }
    }
    decorators
}
