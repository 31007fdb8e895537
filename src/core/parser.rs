use sha2::{Digest, Sha256};
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use crate::config::ParsingConfig;
use crate::error::{NavigatorError, Result, SyntaxDiagnostic};
use super::languages::{node_text, PythonSyntax};

/// Longest snippet of offending source quoted in a diagnostic
const SNIPPET_LIMIT: usize = 24;

/// A successfully parsed source file, holding the tree and the text it spans
pub struct SyntaxTree<'src> {
    tree: Tree,
    source: &'src str,
}

impl<'src> SyntaxTree<'src> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// SHA-256 of the parsed source, hex encoded
    pub fn content_hash(&self) -> String {
        calculate_hash(self.source)
    }
}

/// Python source parser that rejects syntactically invalid input
pub struct SourceParser {
    config: ParsingConfig,
    parser: Parser,
}

impl SourceParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&PythonSyntax::language())
            .map_err(|e| NavigatorError::Parser(format!("Failed to set Python language: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            parser,
        })
    }

    /// Parse source text into a syntax tree.
    ///
    /// Tree-sitter recovers from errors by inserting ERROR and MISSING nodes;
    /// any such node turns the whole parse into a syntax error.
    pub fn parse<'src>(&mut self, source: &'src str) -> Result<SyntaxTree<'src>> {
        if source.len() > self.config.max_file_size {
            return Err(NavigatorError::InputTooLarge {
                size: source.len(),
                limit: self.config.max_file_size,
            });
        }

        let tree = self.parser.parse(source, None)
            .ok_or_else(|| NavigatorError::Parser("Failed to parse Python code".to_string()))?;

        let root = tree.root_node();
        if let Some(line) = deeper_than(root, self.config.max_depth) {
            return Err(NavigatorError::NestingTooDeep {
                line,
                limit: self.config.max_depth,
            });
        }

        if root.has_error() {
            let diagnostic = first_error(root, source).unwrap_or_else(|| SyntaxDiagnostic {
                message: "invalid syntax".to_string(),
                line: root.start_position().row + 1,
                column: root.start_position().column + 1,
            });
            debug!("Rejecting source: {}", diagnostic);
            return Err(NavigatorError::Syntax(diagnostic));
        }

        // Constructs the grammar accepts but the language rejects
        if let Some(diagnostic) = first_invalid_construct(root, source) {
            debug!("Rejecting source: {}", diagnostic);
            return Err(NavigatorError::Syntax(diagnostic));
        }

        debug!("Parsed {} bytes into {} top-level nodes", source.len(), root.named_child_count());

        Ok(SyntaxTree { tree, source })
    }
}

/// Locate the earliest ERROR or MISSING node, descending only into subtrees
/// that contain one.
fn first_error(node: Node, source: &str) -> Option<SyntaxDiagnostic> {
    if node.is_missing() {
        return Some(diagnostic_at(node, format!("missing \"{}\"", node.kind())));
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    for child in children {
        if child.has_error() {
            if let Some(found) = first_error(child, source) {
                return Some(found);
            }
        }
    }

    if node.is_error() {
        return Some(diagnostic_at(node, format!("unexpected \"{}\"", snippet(node, source))));
    }

    None
}

/// Visit every node in pre-order together with its depth, without recursion,
/// stopping at the first node `check` reports on.
fn find_in_tree<'tree, T>(
    root: Node<'tree>,
    mut check: impl FnMut(Node<'tree>, usize) -> Option<T>,
) -> Option<T> {
    let mut cursor = root.walk();
    let mut depth = 0;

    loop {
        if let Some(found) = check(cursor.node(), depth) {
            return Some(found);
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

/// 1-based line of the first node nested more than `limit` levels deep
fn deeper_than(root: Node, limit: usize) -> Option<usize> {
    find_in_tree(root, |node, depth| {
        (depth > limit).then(|| node.start_position().row + 1)
    })
}

/// Python 2 statements and suites with no statements parse without ERROR
/// nodes but are not valid Python 3.
fn first_invalid_construct(root: Node, source: &str) -> Option<SyntaxDiagnostic> {
    find_in_tree(root, |node, _| match node.kind() {
        "print_statement" | "exec_statement" => {
            let keyword = node.child(0).map_or("print", |token| node_text(token, source));
            Some(diagnostic_at(node, format!("missing parentheses in call to \"{}\"", keyword)))
        }
        "block" if !has_statement(node) => Some(diagnostic_after(
            source,
            node.end_byte(),
            "expected an indented block".to_string(),
        )),
        _ => None,
    })
}

fn has_statement(block: Node) -> bool {
    let mut cursor = block.walk();
    let found = block.named_children(&mut cursor).any(|child| child.kind() != "comment");
    found
}

fn diagnostic_at(node: Node, message: String) -> SyntaxDiagnostic {
    let position = node.start_position();
    SyntaxDiagnostic {
        message,
        line: position.row + 1,
        column: position.column + 1,
    }
}

/// Diagnostic at the first non-blank character from `offset` on
fn diagnostic_after(source: &str, offset: usize, message: String) -> SyntaxDiagnostic {
    let at = source[offset..]
        .find(|c: char| !c.is_whitespace())
        .map_or(source.len(), |skipped| offset + skipped);
    let before = &source[..at];
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);

    SyntaxDiagnostic {
        message,
        line: before.matches('\n').count() + 1,
        column: at - line_start + 1,
    }
}

fn snippet(node: Node, source: &str) -> String {
    let text = node_text(node, source).lines().next().unwrap_or("").trim();
    if text.chars().count() > SNIPPET_LIMIT {
        let truncated: String = text.chars().take(SNIPPET_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SourceParser {
        SourceParser::new(&ParsingConfig::default()).unwrap()
    }

    #[test]
    fn empty_source_is_valid() {
        let mut parser = parser();
        let tree = parser.parse("").unwrap();
        assert_eq!(tree.root().named_child_count(), 0);
    }

    #[test]
    fn malformed_definition_reports_location() {
        let mut parser = parser();
        let err = parser.parse("def a(:\n").err().unwrap();
        match err {
            NavigatorError::Syntax(diagnostic) => {
                assert_eq!(diagnostic.line, 1);
                assert!(diagnostic.column >= 1);
                assert!(!diagnostic.message.is_empty());
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn error_on_later_line_is_located() {
        let mut parser = parser();
        let source = "def ok():\n    pass\n\nx = (1 +\n";
        match parser.parse(source).err().unwrap() {
            NavigatorError::Syntax(diagnostic) => assert!(diagnostic.line >= 4),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    fn syntax_error(source: &str) -> SyntaxDiagnostic {
        match parser().parse(source).err() {
            Some(NavigatorError::Syntax(diagnostic)) => diagnostic,
            other => panic!("expected syntax error for {:?}, got {:?}", source, other.map(|e| e.to_string())),
        }
    }

    #[test]
    fn unindented_body_is_rejected() {
        let diagnostic = syntax_error("def f():\nreturn g()\n\ndef g():\n    pass\n");
        assert_eq!(diagnostic.line, 2);
        assert!(diagnostic.message.contains("indented block"));
    }

    #[test]
    fn unindented_class_and_if_bodies_are_rejected() {
        assert_eq!(syntax_error("class A:\npass\n").line, 2);
        assert_eq!(syntax_error("def f(x):\n    if x:\n    return 1\n").line, 3);
    }

    #[test]
    fn comment_only_body_is_rejected() {
        syntax_error("def f():\n    # nothing yet\n");
    }

    #[test]
    fn python2_statements_are_rejected() {
        let diagnostic = syntax_error("print 'hello'\ndef f():\n    pass\n");
        assert_eq!((diagnostic.line, diagnostic.column), (1, 1));
        assert!(diagnostic.message.contains("\"print\""));

        let diagnostic = syntax_error("def f():\n    exec 'x = 1'\n");
        assert_eq!(diagnostic.line, 2);
        assert!(diagnostic.message.contains("\"exec\""));
    }

    #[test]
    fn print_and_exec_calls_are_valid() {
        let mut parser = parser();
        assert!(parser.parse("print('hello')\nexec('x = 1')\n").is_ok());
        assert!(parser.parse("def f():\n    pass  # done\n    # trailing\n").is_ok());
    }

    #[test]
    fn deep_nesting_is_rejected_without_overflow() {
        let depth = 50_000;
        let source = format!("def f():\n    return {}1{}\n", "(".repeat(depth), ")".repeat(depth));

        let err = parser().parse(&source).err().unwrap();
        assert!(matches!(err, NavigatorError::NestingTooDeep { line: 2, .. }), "{:?}", err);
    }

    #[test]
    fn nesting_limit_is_configurable() {
        let source = "def f():\n    return ((1))\n";
        let config = ParsingConfig {
            max_depth: 3,
            ..ParsingConfig::default()
        };
        let mut strict = SourceParser::new(&config).unwrap();
        assert!(matches!(strict.parse(source), Err(NavigatorError::NestingTooDeep { limit: 3, .. })));
        assert!(parser().parse(source).is_ok());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let config = ParsingConfig {
            max_file_size: 8,
            ..ParsingConfig::default()
        };
        let mut parser = SourceParser::new(&config).unwrap();
        let err = parser.parse("def long_name():\n    pass\n").err().unwrap();
        assert!(matches!(err, NavigatorError::InputTooLarge { limit: 8, .. }));
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = calculate_hash("def a():\n    pass\n");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, calculate_hash("def a():\n    pass\n"));
        assert_ne!(hash, calculate_hash("def b():\n    pass\n"));
    }
}
