//! Graphviz DOT export.
//!
//! Output is fully determined by the graph contents: nodes and edges are
//! written in sorted order.

use std::path::Path;

use crate::config::GraphStyle;
use crate::error::Result;
use super::super::dependency_graph::{DependencyGraph, DependencyNodeKind};
use super::CallGraph;

pub struct DotExporter {
    style: GraphStyle,
}

impl DotExporter {
    pub fn new(style: &GraphStyle) -> Self {
        Self { style: style.clone() }
    }

    /// Convert a call graph to a DOT string
    pub fn to_dot(&self, graph: &CallGraph) -> String {
        let mut lines = self.header();

        for node in graph.nodes() {
            lines.push(format!("  \"{}\";", escape(node)));
        }
        for edge in graph.edges() {
            lines.push(format!("  \"{}\" -> \"{}\";", escape(&edge.caller), escape(&edge.callee)));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    /// Convert a dependency graph to a DOT string, colouring class nodes
    pub fn dependencies_to_dot(&self, graph: &DependencyGraph) -> String {
        let mut lines = self.header();

        for (name, kind) in graph.nodes() {
            match kind {
                DependencyNodeKind::Class => lines.push(format!(
                    "  \"{}\" [fillcolor=\"{}\"];",
                    escape(name),
                    escape(&self.style.class_fill_color)
                )),
                DependencyNodeKind::Function | DependencyNodeKind::Referenced => {
                    lines.push(format!("  \"{}\";", escape(name)))
                }
            }
        }
        for (from, to) in graph.edges() {
            lines.push(format!("  \"{}\" -> \"{}\";", escape(from), escape(to)));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    /// Write a call graph to `path` as DOT
    pub fn export<P: AsRef<Path>>(&self, graph: &CallGraph, path: P) -> Result<()> {
        std::fs::write(path, self.to_dot(graph))?;
        Ok(())
    }

    fn header(&self) -> Vec<String> {
        vec![
            format!("digraph \"{}\" {{", escape(&self.style.name)),
            format!("  rankdir=\"{}\";", escape(&self.style.rankdir)),
            format!(
                "  node [shape={}, style=\"{}\", fillcolor=\"{}\"];",
                dot_id(&self.style.node_shape),
                escape(&self.style.node_style),
                escape(&self.style.fill_color)
            ),
        ]
    }
}

/// A DOT ID: plain identifiers stay bare, anything else is quoted
fn dot_id(value: &str) -> String {
    let plain = !value.is_empty()
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        value.to_string()
    } else {
        format!("\"{}\"", escape(value))
    }
}

/// Escape a value for use inside a double-quoted DOT string
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
