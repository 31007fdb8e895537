// src/core/extractor.rs
//! Function and call extraction.
//!
//! Two passes over one syntax tree: a pre-order walk that records every
//! function definition, then a walk of each definition's own subtree that
//! collects the direct calls it makes to other functions of the same file.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use tree_sitter::Node;

use crate::config::{DuplicatePolicy, ParsingConfig};
use crate::error::{NavigatorError, Result};
use super::languages::{node_text, PythonSyntax, SyntaxKind};
use super::parser::{SourceParser, SyntaxTree};

/// A function definition discovered in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function name
    pub name: String,

    /// First line of the definition (1-based, inclusive)
    pub start_line: usize,

    /// Last line of the definition (1-based, inclusive)
    pub end_line: usize,

    /// Verbatim source of the lines the definition spans
    pub source_text: String,

    /// Declared with `async def`
    pub is_async: bool,

    /// Number of enclosing function definitions
    pub depth: usize,
}

/// Mapping from each function name to the same-file functions it calls.
///
/// Every callee is itself a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSet {
    calls: BTreeMap<String, BTreeSet<String>>,
}

impl CallSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function name with no calls, keeping any existing entry
    pub fn insert_function(&mut self, name: &str) {
        self.calls.entry(name.to_string()).or_default();
    }

    /// Replace the call set of a registered function.
    ///
    /// Callees that are not registered functions are dropped.
    pub fn set_callees(&mut self, name: &str, callees: BTreeSet<String>) {
        let known: BTreeSet<String> = callees
            .into_iter()
            .filter(|callee| self.calls.contains_key(callee))
            .collect();
        if let Some(existing) = self.calls.get_mut(name) {
            *existing = known;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.calls.contains_key(name)
    }

    pub fn callees(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.calls.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.calls.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeSet<String>> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Total number of caller/callee pairs
    pub fn call_count(&self) -> usize {
        self.calls.values().map(BTreeSet::len).sum()
    }
}

impl<'a> IntoIterator for &'a CallSet {
    type Item = (&'a String, &'a BTreeSet<String>);
    type IntoIter = btree_map::Iter<'a, String, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}

/// Result of analysing one source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Definitions in discovery (pre-order) order
    pub functions: Vec<FunctionRecord>,

    /// Direct same-file calls per function name
    pub calls: CallSet,

    /// SHA-256 of the analysed source
    pub content_hash: String,
}

impl Extraction {
    /// True when the source parsed but defines no functions
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Parse `source` and extract its functions and calls with default settings
pub fn extract_functions_and_calls(source: &str) -> Result<Extraction> {
    let config = ParsingConfig::default();
    let mut parser = SourceParser::new(&config)?;
    let tree = parser.parse(source)?;
    Extractor::new(config.duplicate_policy).extract(&tree)
}

/// Walks a syntax tree and builds an [`Extraction`]
pub struct Extractor {
    policy: DuplicatePolicy,
}

/// A definition found in the first pass, still tied to its tree node
struct Definition<'tree> {
    node: Node<'tree>,
    record: FunctionRecord,
}

impl Extractor {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    pub fn extract(&self, tree: &SyntaxTree) -> Result<Extraction> {
        let source = tree.source();

        let mut definitions = Vec::new();
        collect_definitions(tree.root(), source, 0, &mut definitions);
        debug!("Discovered {} function definitions", definitions.len());

        let mut calls = CallSet::new();
        for definition in &definitions {
            calls.insert_function(&definition.record.name);
        }

        let known: HashSet<&str> = calls.names().collect();
        let mut resolved: Vec<BTreeSet<String>> = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let mut callees = BTreeSet::new();
            for decorator in PythonSyntax::decorators(definition.node) {
                collect_calls(decorator, source, &known, &mut callees);
            }
            collect_calls(definition.node, source, &known, &mut callees);
            resolved.push(callees);
        }

        self.fold_duplicates(&definitions, resolved, &mut calls)?;

        Ok(Extraction {
            functions: definitions.into_iter().map(|d| d.record).collect(),
            calls,
            content_hash: tree.content_hash(),
        })
    }

    /// Assign each definition's callees to its name key according to the policy
    fn fold_duplicates(
        &self,
        definitions: &[Definition],
        resolved: Vec<BTreeSet<String>>,
        calls: &mut CallSet,
    ) -> Result<()> {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for (definition, callees) in definitions.iter().zip(resolved) {
            let record = &definition.record;
            match first_seen.get(record.name.as_str()) {
                None => {
                    first_seen.insert(&record.name, record.start_line);
                    calls.set_callees(&record.name, callees);
                }
                Some(&first_line) => match self.policy {
                    DuplicatePolicy::LastWins => {
                        debug!("`{}` redefined at line {}; later definition wins", record.name, record.start_line);
                        calls.set_callees(&record.name, callees);
                    }
                    DuplicatePolicy::FirstWins => {
                        debug!("`{}` redefined at line {}; keeping first definition", record.name, record.start_line);
                    }
                    DuplicatePolicy::Reject => {
                        return Err(NavigatorError::DuplicateFunction {
                            name: record.name.clone(),
                            first_line,
                            second_line: record.start_line,
                        });
                    }
                },
            }
        }

        Ok(())
    }
}

/// First pass: pre-order walk recording every function definition
fn collect_definitions<'tree>(
    node: Node<'tree>,
    source: &str,
    depth: usize,
    definitions: &mut Vec<Definition<'tree>>,
) {
    let child_depth = match PythonSyntax::classify(node) {
        SyntaxKind::FunctionDefinition { name, is_async } => {
            let last = PythonSyntax::last_code_token(node);
            let (start_line, end_line) = line_span(node, last);
            definitions.push(Definition {
                node,
                record: FunctionRecord {
                    name: node_text(name, source).to_string(),
                    start_line,
                    end_line,
                    source_text: line_text(node, last, source),
                    is_async,
                    depth,
                },
            });
            depth + 1
        }
        _ => depth,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_definitions(child, source, child_depth, definitions);
    }
}

/// Second pass: direct calls inside one definition's subtree and its
/// decorators
fn collect_calls(node: Node, source: &str, known: &HashSet<&str>, callees: &mut BTreeSet<String>) {
    if let SyntaxKind::Call { function } = PythonSyntax::classify(node) {
        let callee = PythonSyntax::callee(function, source);
        if let Some(name) = callee.direct_name() {
            if known.contains(name) {
                callees.insert(name.to_string());
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls(child, source, known, callees);
    }
}

/// 1-based inclusive line range from the start of `node` to the end of `last`
fn line_span(node: Node, last: Node) -> (usize, usize) {
    let start = node.start_position();
    let end = last.end_position();
    // A node ending at column 0 stops right after the previous line's newline.
    let end_row = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };
    (start.row + 1, end_row + 1)
}

/// Source of every line from `node` through `last`, without the final line
/// terminator
fn line_text(node: Node, last: Node, source: &str) -> String {
    let start = node.start_byte() - node.start_position().column;

    let mut end = last.end_byte();
    if last.end_position().column == 0 && end > node.start_byte() {
        end -= 1;
    }
    let end = source[end..].find('\n').map_or(source.len(), |offset| end + offset);

    let text = &source[start..end];
    text.strip_suffix('\r').unwrap_or(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_with(source: &str, policy: DuplicatePolicy) -> Result<Extraction> {
        let mut parser = SourceParser::new(&ParsingConfig::default()).unwrap();
        let tree = parser.parse(source)?;
        Extractor::new(policy).extract(&tree)
    }

    fn callees(extraction: &Extraction, name: &str) -> Vec<String> {
        extraction.calls.callees(name).unwrap().iter().cloned().collect()
    }

    #[test]
    fn records_line_ranges_and_source() {
        let source = "import os\n\ndef a():\n    b()\n    return 1\n\ndef b():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();

        let a = &extraction.functions[0];
        assert_eq!((a.name.as_str(), a.start_line, a.end_line), ("a", 3, 5));
        assert_eq!(a.source_text, "def a():\n    b()\n    return 1");

        let b = &extraction.functions[1];
        assert_eq!((b.start_line, b.end_line), (7, 8));
        assert_eq!(b.source_text, "def b():\n    pass");
    }

    #[test]
    fn method_source_keeps_indentation() {
        let source = "class Greeter:\n    def hello(self):\n        return  'hi'   # spaced\n";
        let extraction = extract_functions_and_calls(source).unwrap();

        assert_eq!(extraction.functions.len(), 1);
        assert_eq!(
            extraction.functions[0].source_text,
            "    def hello(self):\n        return  'hi'   # spaced"
        );
    }

    #[test]
    fn attribute_and_computed_calls_are_not_resolved() {
        let source = "def a():\n    self.b()\n    table['b']()\n    b\n\ndef b():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert!(callees(&extraction, "a").is_empty());
    }

    #[test]
    fn calls_in_arguments_are_found() {
        let source = "def a():\n    print(b(c()))\n\ndef b(x):\n    return x\n\ndef c():\n    return 1\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert_eq!(callees(&extraction, "a"), vec!["b", "c"]);
    }

    #[test]
    fn calls_before_definition_resolve() {
        let source = "def early():\n    late()\n\ndef late():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert_eq!(callees(&extraction, "early"), vec!["late"]);
    }

    #[test]
    fn nested_functions_are_independent_records() {
        let source = "def outer():\n    def inner():\n        helper()\n    return inner()\n\ndef helper():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();

        let names: Vec<_> = extraction.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner", "helper"]);
        assert_eq!(extraction.functions[1].depth, 1);
        assert_eq!((extraction.functions[1].start_line, extraction.functions[1].end_line), (2, 3));

        assert_eq!(callees(&extraction, "inner"), vec!["helper"]);
        // The inner body is part of the outer subtree.
        assert_eq!(callees(&extraction, "outer"), vec!["helper", "inner"]);
    }

    #[test]
    fn async_definitions_are_functions() {
        let source = "async def fetch():\n    await parse()\n\ndef parse():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert!(extraction.functions[0].is_async);
        assert_eq!(callees(&extraction, "fetch"), vec!["parse"]);
    }

    #[test]
    fn decorated_definition_starts_at_def_line() {
        let source = "@cache\ndef a():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert_eq!(extraction.functions[0].start_line, 2);
        assert_eq!(extraction.functions[0].source_text, "def a():\n    pass");
    }

    #[test]
    fn trailing_comments_are_outside_the_range() {
        let source = "def a():\n    pass\n    # trailing\n\ndef b():\n    if a():\n        return 1  # same line\n        # after\n    # end of b\n";
        let extraction = extract_functions_and_calls(source).unwrap();

        let a = &extraction.functions[0];
        assert_eq!((a.start_line, a.end_line), (1, 2));
        assert_eq!(a.source_text, "def a():\n    pass");

        let b = &extraction.functions[1];
        assert_eq!((b.start_line, b.end_line), (5, 7));
        assert_eq!(b.source_text, "def b():\n    if a():\n        return 1  # same line");
    }

    #[test]
    fn decorator_calls_belong_to_the_decorated_function() {
        let source = "def deco(x):\n    return x\n\n@deco(1)\ndef f():\n    pass\n\n@deco\ndef g():\n    pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();

        assert_eq!(callees(&extraction, "f"), vec!["deco"]);
        // A bare decorator name is not a call expression.
        assert!(callees(&extraction, "g").is_empty());

        let f = &extraction.functions[1];
        assert_eq!((f.start_line, f.end_line), (5, 6));
        assert_eq!(f.source_text, "def f():\n    pass");
    }

    #[test]
    fn decorated_methods_attribute_calls_to_the_method() {
        let source = "def register(name):\n    return name\n\nclass Api:\n    @register('list')\n    def list(self):\n        pass\n";
        let extraction = extract_functions_and_calls(source).unwrap();
        assert_eq!(callees(&extraction, "list"), vec!["register"]);
    }

    const DUPLICATES: &str = "def f():\n    a()\n    def f():\n        b()\n\ndef a():\n    pass\n\ndef b():\n    pass\n";

    #[test]
    fn last_definition_wins_by_default() {
        let extraction = extract_with(DUPLICATES, DuplicatePolicy::LastWins).unwrap();

        let ranges: Vec<_> = extraction.functions.iter()
            .filter(|f| f.name == "f")
            .map(|f| (f.start_line, f.end_line))
            .collect();
        assert_eq!(ranges, vec![(1, 4), (3, 4)]);
        assert_eq!(callees(&extraction, "f"), vec!["b"]);
    }

    #[test]
    fn first_wins_keeps_earlier_calls() {
        let extraction = extract_with(DUPLICATES, DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(extraction.functions.len(), 4);
        assert_eq!(callees(&extraction, "f"), vec!["a", "b"]);
    }

    #[test]
    fn reject_reports_both_lines() {
        let err = extract_with(DUPLICATES, DuplicatePolicy::Reject).unwrap_err();
        match err {
            NavigatorError::DuplicateFunction { name, first_line, second_line } => {
                assert_eq!(name, "f");
                assert_eq!((first_line, second_line), (1, 3));
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn call_set_drops_unknown_callees() {
        let mut calls = CallSet::new();
        calls.insert_function("a");
        calls.insert_function("b");
        calls.set_callees("a", ["b", "zzz"].iter().map(|s| s.to_string()).collect());

        assert_eq!(calls.call_count(), 1);
        assert!(!calls.contains("zzz"));
    }
}
