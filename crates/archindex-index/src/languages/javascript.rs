//! JavaScript language extractor using tree-sitter-javascript.

use super::ecmascript;
use crate::extractor::LanguageExtractor;
use archindex_core::{ClassDef, FunctionDef};
use tree_sitter::Tree;

/// JavaScript (and JSX) extractor for tree-sitter-based code indexing.
pub struct JavaScriptExtractor;

impl JavaScriptExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for JavaScriptExtractor {
    fn language_name(&self) -> &str {
        "javascript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn extract_functions(&self, tree: &Tree, source: &[u8]) -> Vec<FunctionDef> {
        ecmascript::extract_functions(tree, source)
    }

    fn extract_classes(&self, tree: &Tree, source: &[u8]) -> Vec<ClassDef> {
        ecmascript::extract_classes(tree, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse_js(source: &str) -> Tree {
        let mut parser = Parser::new();
        let lang = tree_sitter_javascript::LANGUAGE;
        parser
            .set_language(&lang.into())
            .expect("failed to set JavaScript language");
        parser
            .parse(source.as_bytes(), None)
            .expect("failed to parse")
    }

    #[test]
    fn extract_function_declaration_with_jsdoc() {
        let source = r#"
/**
 * Greets someone.
 */
export async function greet(name, greeting = "hi", ...rest) {
  return `${greeting} ${name}`;
}
"#;
        let tree = parse_js(source);
        let funcs = JavaScriptExtractor::new().extract_functions(&tree, source.as_bytes());
        assert_eq!(funcs.len(), 1);
        let greet = &funcs[0];
        assert_eq!(greet.name, "greet");
        assert!(greet.is_async);
        assert_eq!(greet.line_number, 5);
        assert_eq!(greet.docstring.as_deref(), Some("Greets someone."));
        assert_eq!(greet.signature, "async function greet(name, greeting = \"hi\", ...rest)");

        let names: Vec<_> = greet.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "greeting", "rest"]);
        assert_eq!(greet.parameters[1].default.as_deref(), Some("\"hi\""));
        assert!(greet.parameters[2].is_variadic);
    }

    #[test]
    fn named_arrow_functions_only() {
        let source = r#"
const double = (x) => x * 2;
const square = x => { return x * x; };
[1, 2].map((n) => n + 1);
setTimeout(function () {}, 10);
"#;
        let tree = parse_js(source);
        let funcs = JavaScriptExtractor::new().extract_functions(&tree, source.as_bytes());
        let names: Vec<_> = funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["double", "square"]);
        assert_eq!(funcs[1].parameters.len(), 1);
        assert_eq!(funcs[1].signature, "square = x =>");
    }

    #[test]
    fn class_with_methods_and_parent() {
        let source = r#"
/** Base service. */
class UserService extends BaseService {
  constructor(db) {
    super();
    this.db = db;
  }

  async find(id) {
    return this.db.get(id);
  }

  onChange = (event) => {
    this.changed = event;
  };
}
"#;
        let tree = parse_js(source);
        let extractor = JavaScriptExtractor::new();

        let classes = extractor.extract_classes(&tree, source.as_bytes());
        assert_eq!(classes.len(), 1);
        let svc = &classes[0];
        assert_eq!(svc.name, "UserService");
        assert_eq!(svc.parent_classes, vec!["BaseService"]);
        assert_eq!(svc.docstring.as_deref(), Some("Base service."));
        assert_eq!(svc.method_names, vec!["constructor", "find", "onChange"]);

        let funcs = extractor.extract_functions(&tree, source.as_bytes());
        assert_eq!(funcs.len(), 3);
        assert!(funcs.iter().all(|f| f.is_method));
        assert!(funcs
            .iter()
            .all(|f| f.parent_class.as_deref() == Some("UserService")));
        let find = funcs.iter().find(|f| f.name == "find").unwrap();
        assert!(find.is_async);
    }

    #[test]
    fn function_inside_method_is_not_a_method() {
        let source = r#"
class A {
  run() {
    function helper() {}
    const inner = () => 1;
    helper();
  }
}
"#;
        let tree = parse_js(source);
        let funcs = JavaScriptExtractor::new().extract_functions(&tree, source.as_bytes());
        let helper = funcs.iter().find(|f| f.name == "helper").unwrap();
        assert!(!helper.is_method);
        let inner = funcs.iter().find(|f| f.name == "inner").unwrap();
        assert!(inner.parent_class.is_none());
    }
}
