use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location and description of the first syntax problem found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDiagnostic {
    /// Human readable description from the parser
    pub message: String,

    /// 1-based line of the offending token
    pub line: usize,

    /// 1-based column of the offending token
    pub column: usize,
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

/// Main error type for navigator operations
#[derive(Error, Debug)]
pub enum NavigatorError {
    #[error("Syntax error: {0}")]
    Syntax(SyntaxDiagnostic),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Input of {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Nesting deeper than {limit} levels at line {line}")]
    NestingTooDeep { line: usize, limit: usize },

    #[error("Function `{name}` is defined more than once (lines {first_line} and {second_line})")]
    DuplicateFunction {
        name: String,
        first_line: usize,
        second_line: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NavigatorError {
    /// True when the input itself was not valid source code
    pub fn is_syntax(&self) -> bool {
        matches!(self, NavigatorError::Syntax(_))
    }
}

pub type Result<T> = std::result::Result<T, NavigatorError>;
