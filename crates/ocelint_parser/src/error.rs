//! Parser error types.

use thiserror::Error;

/// A syntax error in the inspected source.
#[derive(Debug, Clone, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Line of the offending token (1-indexed).
    pub line: u32,
    /// Column of the offending token (0-indexed).
    pub column: u32,
}

impl ParseError {
    /// Creates a new parse error at the given position.
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}
