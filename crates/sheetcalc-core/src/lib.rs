//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc recalculation engine.
//!
//! This crate provides the fundamental types used throughout sheetcalc:
//! - [`Value`] and [`CellError`] - Cell values, with errors as ordinary values
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing, ranges and
//!   reference shifting
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{CellAddress, CellRange};
//!
//! let addr = CellAddress::parse("$B2").unwrap();
//! assert_eq!(addr.shifted(3, 3).unwrap().to_string(), "$B5");
//!
//! let range = CellRange::parse("A1:B2").unwrap();
//! let cells: Vec<String> = range.cells().map(|a| a.to_string()).collect();
//! assert_eq!(cells, ["A1", "A2", "B1", "B2"]);
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{CellAddress, CellError, CellRange, CellRangeIterator, ErrorValue, Value};
pub use error::{Error, Result};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;
