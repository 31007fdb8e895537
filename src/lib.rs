//! Static call-graph navigator for Python source.
//!
//! Parses one source text, extracts its function definitions and the direct
//! same-file calls between them, and renders the result as a Graphviz DOT
//! call graph.

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::{Config, DuplicatePolicy, GraphStyle};
pub use crate::core::{
    extract_functions_and_calls, CallGraph, CallSet, CommandStatus, DotExporter, Engine, Extraction,
    FunctionRecord, NavigationOutcome,
};
pub use crate::error::{NavigatorError, Result, SyntaxDiagnostic};
