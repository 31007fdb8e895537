// src/core/dependency_graph.rs
//! Loose dependency graph over functions and classes.
//!
//! Unlike the call graph this analysis keeps member calls (`obj.run()` counts
//! as a dependency on `run`), records class inheritance as `base -> class`
//! edges and keeps names that are not defined in the file.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tree_sitter::Node;

use super::languages::{node_text, PythonSyntax, SyntaxKind};
use super::parser::SyntaxTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyNodeKind {
    Function,
    Class,
    /// Named by a call or a base class but not defined in the file
    Referenced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNodeKind>,
    edges: BTreeSet<(String, String)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the dependency graph of a parsed source file
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut graph = Self::new();
        let mut scopes = Vec::new();
        visit(tree.root(), tree.source(), &mut scopes, &mut graph);
        graph
    }

    /// Add a node; a definition replaces an earlier plain reference
    pub fn add_node(&mut self, name: &str, kind: DependencyNodeKind) {
        match self.nodes.get(name) {
            Some(DependencyNodeKind::Referenced) | None => {
                self.nodes.insert(name.to_string(), kind);
            }
            Some(_) => {}
        }
    }

    /// Add an edge, creating referenced nodes for unknown endpoints
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(from, DependencyNodeKind::Referenced);
        self.add_node(to, DependencyNodeKind::Referenced);
        self.edges.insert((from.to_string(), to.to_string()));
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, DependencyNodeKind)> {
        self.nodes.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    pub fn kind_of(&self, name: &str) -> Option<DependencyNodeKind> {
        self.nodes.get(name).copied()
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges.contains(&(from.to_string(), to.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Walk the tree keeping the stack of enclosing definitions
fn visit(node: Node, source: &str, scopes: &mut Vec<String>, graph: &mut DependencyGraph) {
    let pushed = match PythonSyntax::classify(node) {
        SyntaxKind::FunctionDefinition { name, .. } => {
            let name = node_text(name, source);
            graph.add_node(name, DependencyNodeKind::Function);
            scopes.push(name.to_string());
            true
        }
        SyntaxKind::ClassDefinition { name, superclasses } => {
            let name = node_text(name, source);
            graph.add_node(name, DependencyNodeKind::Class);
            if let Some(bases) = superclasses {
                for base in PythonSyntax::base_class_names(bases, source) {
                    graph.add_edge(base, name);
                }
            }
            scopes.push(name.to_string());
            true
        }
        SyntaxKind::Call { function } => {
            if let Some(caller) = scopes.last() {
                let callee = PythonSyntax::callee(function, source);
                if let Some(callee) = callee.loose_name() {
                    let caller = caller.clone();
                    graph.add_edge(&caller, callee);
                }
            }
            false
        }
        SyntaxKind::Other => false,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, scopes, graph);
    }

    if pushed {
        scopes.pop();
    }
}
