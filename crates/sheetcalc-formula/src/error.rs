//! Formula error types
//!
//! These are structural failures: the formula text cannot be turned into an
//! AST, or committing it would corrupt the dependency graph. Runtime failures
//! such as division by zero are values (see [`sheetcalc_core::Value::Error`]).

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while tokenizing, parsing or committing a formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// A character the formula language does not use
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    /// A string literal without its closing quote
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// Grammar violation (unbalanced parentheses, missing operand, ...)
    #[error("Syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    /// Reference that does not name a cell on the grid
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Range with more cells than the dependency tracker accepts
    #[error("Range {range} spans {cells} cells (limit: {limit})")]
    RangeTooLarge { range: String, cells: u64, limit: u64 },

    /// Accepting the formula would make a cell depend on itself
    #[error("Circular reference: {path}")]
    CircularReference { path: String },
}

impl FormulaError {
    pub(crate) fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        FormulaError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Whether this error comes from tokenizing or parsing the text
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            FormulaError::UnexpectedCharacter { .. }
                | FormulaError::UnterminatedString { .. }
                | FormulaError::Syntax { .. }
        )
    }
}
