//! Language-specific syntax for the navigator.
//!
//! Grammar nodes are mapped onto a small closed set of variants so that the
//! extraction passes can dispatch with a plain `match` instead of per-kind
//! callbacks.

mod python;

pub use python::PythonSyntax;

use tree_sitter::Node;

/// The node kinds the analyses care about
#[derive(Debug, Clone, Copy)]
pub enum SyntaxKind<'tree> {
    /// `def name(...)` or `async def name(...)`
    FunctionDefinition {
        name: Node<'tree>,
        is_async: bool,
    },
    /// `class Name(bases...)`
    ClassDefinition {
        name: Node<'tree>,
        superclasses: Option<Node<'tree>>,
    },
    /// `target(arguments)`
    Call { function: Node<'tree> },
    /// Anything else; traversal simply descends into it
    Other,
}

/// What a call expression invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// A bare name such as `helper()`
    Name(String),
    /// Member access such as `self.helper()` or `os.path.join()`, by member name
    Attribute(String),
    /// Subscripts, nested calls, lambdas and every other computed target
    Computed,
}

impl Callee {
    /// Name used by the strict call-graph analysis: bare names only
    pub fn direct_name(&self) -> Option<&str> {
        match self {
            Callee::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Name used by the loose dependency analysis: bare names or the member name
    pub fn loose_name(&self) -> Option<&str> {
        match self {
            Callee::Name(name) => Some(name),
            Callee::Attribute(attribute) => Some(attribute),
            Callee::Computed => None,
        }
    }
}

/// Extract text content of a node
pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}
