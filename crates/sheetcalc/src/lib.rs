//! # sheetcalc
//!
//! An incremental spreadsheet recalculation engine.
//!
//! sheetcalc parses spreadsheet formulas, tracks which cells read which other
//! cells, refuses edits that would create a circular reference, and after
//! each edit recomputes exactly the cells downstream of the change, in
//! dependency order.
//!
//! ## Features
//!
//! - Formula language with arithmetic, comparison and text operators,
//!   cell references (`A1`, `$B$2`) and ranges (`A1:C10`)
//! - Built-in math, logical, text and info functions
//! - Errors as values (`#DIV/0!`, `#REF!`, `#NAME?`, ...)
//! - Cycle detection before any edit is committed
//! - Copy and fill of formulas with relative reference shifting
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Spreadsheet::new();
//! sheet.set_cell("A1", "10").unwrap();
//! sheet.set_cell("A2", "=A1*2").unwrap();
//! sheet.set_cell("A3", "=SUM(A1:A2)").unwrap();
//! assert_eq!(sheet.value("A3").unwrap(), Value::Number(30.0));
//!
//! // Editing A1 recomputes A2, then A3
//! let stats = sheet.set_cell("A1", "1").unwrap();
//! assert_eq!(stats.cells_calculated, 2);
//! assert_eq!(sheet.value("A3").unwrap(), Value::Number(3.0));
//!
//! // Cycles are refused and leave the sheet untouched
//! assert!(sheet.set_cell("A1", "=A3").is_err());
//! assert_eq!(sheet.value("A1").unwrap(), Value::Number(1.0));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, CellLocation, Spreadsheet};

// Re-export core types
pub use sheetcalc_core::{CellAddress, CellError, CellRange, ErrorValue, Value, MAX_COLS, MAX_ROWS};

// Re-export formula types
pub use sheetcalc_formula::{
    evaluate, parse_formula, shift_formula, tokenize, CellKey, DependencyGraph, EmptyContext,
    EvaluationContext, FormulaError, FormulaExpr, FormulaResult, FunctionRegistry, Token,
    TokenKind,
};

use thiserror::Error;

/// Errors returned by spreadsheet edits
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed cell address
    #[error(transparent)]
    Address(#[from] sheetcalc_core::Error),

    /// The formula could not be parsed or its references are unusable
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The edit would make the cell depend on itself
    #[error("Circular reference in {cell}: {path}")]
    CircularReference { cell: CellKey, path: String },
}

/// Result type for spreadsheet operations
pub type Result<T> = std::result::Result<T, Error>;
