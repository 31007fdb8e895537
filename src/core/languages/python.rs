use tree_sitter::{Language, Node};

use super::{node_text, Callee, SyntaxKind};

/// Python grammar bindings and node classification
pub struct PythonSyntax;

impl PythonSyntax {
    /// Tree-sitter grammar for Python
    pub fn language() -> Language {
        tree_sitter_python::language()
    }

    /// Get the file extensions this grammar handles
    pub fn file_extensions() -> &'static [&'static str] {
        &["py", "pyi"]
    }

    /// Get the language name
    pub fn language_name() -> &'static str {
        "python"
    }

    /// Map a grammar node onto the variants the analyses dispatch on
    pub fn classify<'tree>(node: Node<'tree>) -> SyntaxKind<'tree> {
        match node.kind() {
            "function_definition" => match node.child_by_field_name("name") {
                Some(name) => SyntaxKind::FunctionDefinition {
                    name,
                    is_async: Self::is_async_definition(node),
                },
                None => SyntaxKind::Other,
            },
            "class_definition" => match node.child_by_field_name("name") {
                Some(name) => SyntaxKind::ClassDefinition {
                    name,
                    superclasses: node.child_by_field_name("superclasses"),
                },
                None => SyntaxKind::Other,
            },
            "call" => match node.child_by_field_name("function") {
                Some(function) => SyntaxKind::Call { function },
                None => SyntaxKind::Other,
            },
            _ => SyntaxKind::Other,
        }
    }

    /// Resolve the target expression of a call
    pub fn callee(function: Node, source: &str) -> Callee {
        match function.kind() {
            "identifier" => Callee::Name(node_text(function, source).to_string()),
            "attribute" => match function.child_by_field_name("attribute") {
                Some(attribute) => Callee::Attribute(node_text(attribute, source).to_string()),
                None => Callee::Computed,
            },
            _ => Callee::Computed,
        }
    }

    /// Bare-name base classes listed in a class header
    pub fn base_class_names<'s>(superclasses: Node, source: &'s str) -> Vec<&'s str> {
        let mut cursor = superclasses.walk();
        let names = superclasses
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "identifier")
            .map(|child| node_text(child, source))
            .collect();
        names
    }

    /// Decorators applied to a definition; they sit on the wrapping
    /// `decorated_definition` node, outside the definition itself
    pub fn decorators<'tree>(definition: Node<'tree>) -> Vec<Node<'tree>> {
        match definition.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => {
                let mut cursor = parent.walk();
                let decorators = parent
                    .named_children(&mut cursor)
                    .filter(|child| child.kind() == "decorator")
                    .collect();
                decorators
            }
            _ => Vec::new(),
        }
    }

    /// Last token of a node that is not a comment.
    ///
    /// Comments after the final statement of a block belong to the block in
    /// the tree but not to the definition's line range.
    pub fn last_code_token(node: Node) -> Node {
        let mut last = node;
        loop {
            let mut cursor = last.walk();
            let children: Vec<Node> = last.children(&mut cursor).collect();
            match children.into_iter().rev().find(|child| child.kind() != "comment") {
                Some(child) => last = child,
                None => return last,
            }
        }
    }

    fn is_async_definition(node: Node) -> bool {
        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|child| child.kind() == "async");
        is_async
    }
}
