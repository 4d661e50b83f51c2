//! Cell-related types and utilities
//!
//! This module contains:
//! - [`Value`] - The computed value of a cell
//! - [`CellError`] - The error kinds a value can carry
//! - [`CellAddress`] - A cell's location (e.g., "A1", "$B$2")
//! - [`CellRange`] - A rectangular block of cells (e.g., "A1:B10")

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use value::{CellError, ErrorValue, Value};
