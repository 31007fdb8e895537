// src/core/mod.rs
mod engine;
mod parser;
mod extractor;
mod dependency_graph;
mod report;

// Call graph construction and DOT export
mod call_graph;

// Language-specific syntax
mod languages;

pub use parser::{calculate_hash, SourceParser, SyntaxTree};
pub use extractor::{extract_functions_and_calls, CallSet, Extraction, Extractor, FunctionRecord};
pub use dependency_graph::{DependencyGraph, DependencyNodeKind};
pub use report::{render_calls, render_functions, render_stats, OutputFormat, NOTHING_FOUND};
pub use languages::{Callee, PythonSyntax, SyntaxKind};

pub use call_graph::{CallGraph, CallEdge, CallGraphStats, DotExporter};

// Export the main engine
pub use engine::{read_input, write_output, CommandStatus, Engine, Navigation, NavigationOutcome};
