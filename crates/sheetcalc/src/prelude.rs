//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CellAddress,
    CellError,
    CellKey,
    CellLocation,
    CellRange,
    // Error types
    Error,
    ErrorValue,
    Result,
    // Main types
    Spreadsheet,
    Value,
};
