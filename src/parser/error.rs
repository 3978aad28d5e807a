use thiserror::Error;

/// First grammar violation found by the parser. Parsing stops there.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Expected {expected} at line {line}, got {found}")]
    Expected {
        expected: &'static str,
        found: String,
        line: usize,
    },
    #[error("Invalid number literal '{literal}' at line {line}")]
    InvalidNumber { literal: String, line: usize },
    #[error("Unexpected {found} after program body at line {line}")]
    TrailingInput { found: String, line: usize },
}
