// src/core/call_graph/mod.rs
//! Call graph construction and export.
//!
//! The graph is built from an extracted call mapping: one node per function
//! and one edge per observed caller/callee pair.

mod call_graph;
mod dot;

pub use call_graph::{CallGraph, CallEdge, CallGraphStats};
pub use dot::DotExporter;
