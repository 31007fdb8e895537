// src/core/report.rs
//! Human and machine readable listings of an analysis.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{NavigatorError, Result};
use super::call_graph::{CallGraph, CallGraphStats};
use super::extractor::{Extraction, FunctionRecord};

/// Listing format for the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Dot,
}

impl FromStr for OutputFormat {
    type Err = NavigatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "dot" | "graphviz" => Ok(OutputFormat::Dot),
            other => Err(NavigatorError::Config(format!("Unknown output format: {}", other))),
        }
    }
}

/// Notice shown when a valid source defines no functions
pub const NOTHING_FOUND: &str = "No function definitions found.";

pub fn render_functions(extraction: &Extraction, include_source: bool, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let listed: Vec<FunctionListing> = extraction.functions.iter()
                .map(|f| FunctionListing::new(f, include_source))
                .collect();
            Ok(serde_json::to_string_pretty(&listed)?)
        }
        _ => {
            let mut out = String::new();
            for function in &extraction.functions {
                let _ = writeln!(
                    out,
                    "{}{} (lines {}-{})",
                    if function.is_async { "async " } else { "" },
                    function.name,
                    function.start_line,
                    function.end_line
                );
                if include_source {
                    for line in function.source_text.lines() {
                        let _ = writeln!(out, "    | {}", line);
                    }
                    out.push('\n');
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub fn render_calls(extraction: &Extraction, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&extraction.calls)?),
        _ => {
            let mut out = String::new();
            for (caller, callees) in &extraction.calls {
                if callees.is_empty() {
                    let _ = writeln!(out, "{} -> (none)", caller);
                } else {
                    let names: Vec<&str> = callees.iter().map(String::as_str).collect();
                    let _ = writeln!(out, "{} -> {}", caller, names.join(", "));
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub fn render_stats(graph: &CallGraph, format: OutputFormat) -> Result<String> {
    let summary = GraphSummary {
        statistics: graph.get_statistics(),
        entry_points: graph.get_entry_point_candidates(),
        isolated: graph.get_isolated_nodes(),
        cycles: graph.detect_cycles(),
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&summary)?),
        _ => {
            let stats = &summary.statistics;
            let mut out = String::new();
            let _ = writeln!(out, "functions:      {}", stats.total_functions);
            let _ = writeln!(out, "calls:          {}", stats.total_calls);
            let _ = writeln!(out, "self calls:     {}", stats.self_calls);
            let _ = writeln!(out, "max in-degree:  {}", stats.max_in_degree);
            let _ = writeln!(out, "max out-degree: {}", stats.max_out_degree);
            let _ = writeln!(out, "entry points:   {}", list_or_none(&summary.entry_points));
            let _ = writeln!(out, "isolated:       {}", list_or_none(&summary.isolated));
            if summary.cycles.is_empty() {
                let _ = writeln!(out, "cycles:         (none)");
            } else {
                for cycle in &summary.cycles {
                    let mut path = cycle.clone();
                    if let Some(first) = cycle.first() {
                        path.push(first.clone());
                    }
                    let _ = writeln!(out, "cycle:          {}", path.join(" -> "));
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

fn list_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

#[derive(Serialize)]
struct FunctionListing<'a> {
    name: &'a str,
    start_line: usize,
    end_line: usize,
    is_async: bool,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_text: Option<&'a str>,
}

impl<'a> FunctionListing<'a> {
    fn new(record: &'a FunctionRecord, include_source: bool) -> Self {
        Self {
            name: &record.name,
            start_line: record.start_line,
            end_line: record.end_line,
            is_async: record.is_async,
            depth: record.depth,
            source_text: include_source.then_some(record.source_text.as_str()),
        }
    }
}

#[derive(Serialize)]
struct GraphSummary<'a> {
    statistics: CallGraphStats,
    entry_points: Vec<&'a str>,
    isolated: Vec<&'a str>,
    cycles: Vec<Vec<String>>,
}
