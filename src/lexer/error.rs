use thiserror::Error;

/// Lexer diagnostics. None of these stop scanning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string at line {line}")]
    UnterminatedString { line: usize },
}
