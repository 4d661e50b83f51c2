//! Spreadsheet calculation engine
//!
//! Holds cell contents, keeps the dependency graph in step with every
//! formula edit, refuses edits that would close a cycle, and recomputes the
//! cells downstream of each change in dependency order.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Spreadsheet::new();
//! sheet.set_cell("A1", "10").unwrap();
//! sheet.set_cell("A2", "20").unwrap();
//! sheet.set_cell("A3", "=A1+A2").unwrap();
//!
//! let stats = sheet.set_cell("A1", "5").unwrap();
//! println!("Calculated {} cells", stats.cells_calculated);
//! assert_eq!(sheet.value("A3").unwrap(), Value::Number(25.0));
//! ```

use crate::{Error, Result};
use ahash::AHashMap;
use sheetcalc_core::{CellAddress, Value};
use sheetcalc_formula::dependency::format_path;
use sheetcalc_formula::{
    collect_precedents, evaluate, parse_formula, shift_formula, CellKey, DependencyGraph,
    EvaluationContext, FormulaExpr, DEFAULT_MAX_RANGE_CELLS,
};

/// Options for spreadsheet calculation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalculationOptions {
    /// Largest range (in cells) a formula may reference (default: one full column)
    pub max_range_cells: u64,
    /// Recompute dependents after every edit (default: true).
    /// When off, dependents keep stale values until
    /// [`Spreadsheet::recalculate_all`] runs.
    pub recalculate_on_edit: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            recalculate_on_edit: true,
        }
    }
}

/// Statistics from an edit or a recalculation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CalculationStats {
    /// Number of formula cells evaluated
    pub cells_calculated: usize,
    /// Number of evaluated cells whose result is an error value
    pub errors: usize,
}

impl CalculationStats {
    fn record(&mut self, value: &Value) {
        self.cells_calculated += 1;
        if value.is_error() {
            self.errors += 1;
        }
    }

    fn merge(&mut self, other: CalculationStats) {
        self.cells_calculated += other.cells_calculated;
        self.errors += other.errors;
    }
}

/// Anything that names a cell: A1 text, a [`CellAddress`] or a [`CellKey`]
pub trait CellLocation {
    fn to_cell_key(&self) -> Result<CellKey>;
}

impl CellLocation for str {
    fn to_cell_key(&self) -> Result<CellKey> {
        Ok(self.trim().parse::<CellKey>()?)
    }
}

impl CellLocation for String {
    fn to_cell_key(&self) -> Result<CellKey> {
        self.as_str().to_cell_key()
    }
}

impl CellLocation for CellAddress {
    fn to_cell_key(&self) -> Result<CellKey> {
        Ok(CellKey::from(self))
    }
}

impl CellLocation for CellKey {
    fn to_cell_key(&self) -> Result<CellKey> {
        Ok(*self)
    }
}

impl<T: CellLocation + ?Sized> CellLocation for &T {
    fn to_cell_key(&self) -> Result<CellKey> {
        (**self).to_cell_key()
    }
}

/// A parsed formula together with the text it came from
#[derive(Debug, Clone)]
struct FormulaCell {
    /// Formula text including the leading `=`
    text: String,
    ast: FormulaExpr,
}

#[derive(Debug, Clone)]
struct CellEntry {
    value: Value,
    formula: Option<FormulaCell>,
}

/// An in-memory sheet with incremental recalculation
#[derive(Debug, Clone, Default)]
pub struct Spreadsheet {
    options: CalculationOptions,
    /// Non-empty cells
    cells: AHashMap<CellKey, CellEntry>,
    /// Formula edges between cells
    graph: DependencyGraph,
}

impl Spreadsheet {
    /// Create an empty sheet with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sheet with custom options
    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Set a cell from user input.
    ///
    /// Input starting with `=` (after leading whitespace) is a formula.
    /// Anything else is a literal: `TRUE`/`FALSE` in any case, a number, or
    /// text. Blank input clears the cell.
    ///
    /// A formula that fails to parse, references an oversized range or would
    /// create a circular reference is rejected with an error, and the sheet
    /// is left exactly as it was.
    pub fn set_cell(&mut self, cell: impl CellLocation, input: &str) -> Result<CalculationStats> {
        let key = cell.to_cell_key()?;
        let trimmed = input.trim_start();

        if trimmed.starts_with('=') {
            self.set_formula(key, trimmed)
        } else {
            Ok(self.set_literal(key, parse_literal(input)))
        }
    }

    /// Remove a cell's contents. Cells reading it now see an empty cell.
    pub fn clear_cell(&mut self, cell: impl CellLocation) -> Result<CalculationStats> {
        let key = cell.to_cell_key()?;
        Ok(self.set_literal(key, None))
    }

    /// Current value of a cell (`Value::Empty` when unset)
    pub fn value(&self, cell: impl CellLocation) -> Result<Value> {
        let key = cell.to_cell_key()?;
        Ok(self.value_at(key))
    }

    /// Formula text of a cell, including the leading `=`
    pub fn formula(&self, cell: impl CellLocation) -> Result<Option<String>> {
        let key = cell.to_cell_key()?;
        Ok(self
            .cells
            .get(&key)
            .and_then(|entry| entry.formula.as_ref())
            .map(|formula| formula.text.clone()))
    }

    /// Copy a cell to another cell.
    ///
    /// A formula has its relative references moved by the offset between
    /// the two cells; a literal is copied as is; an empty source clears the
    /// target.
    pub fn copy_formula(
        &mut self,
        from: impl CellLocation,
        to: impl CellLocation,
    ) -> Result<CalculationStats> {
        let from = from.to_cell_key()?;
        let to = to.to_cell_key()?;

        let Some(entry) = self.cells.get(&from) else {
            return Ok(self.set_literal(to, None));
        };

        match &entry.formula {
            Some(formula) => {
                let body = formula.text.strip_prefix('=').unwrap_or(&formula.text);
                let row_delta = i64::from(to.row) - i64::from(from.row);
                let col_delta = i64::from(to.col) - i64::from(from.col);
                let shifted = shift_formula(body, row_delta, col_delta)?;
                self.set_formula(to, &format!("={}", shifted))
            }
            None => {
                let value = entry.value.clone();
                Ok(self.set_literal(to, Some(value)))
            }
        }
    }

    /// Copy a cell into each target in turn, stopping at the first failure.
    ///
    /// Targets filled before the failure keep their new contents.
    pub fn fill_formula<I>(&mut self, from: impl CellLocation, targets: I) -> Result<CalculationStats>
    where
        I: IntoIterator,
        I::Item: CellLocation,
    {
        let from = from.to_cell_key()?;
        let mut stats = CalculationStats::default();
        for target in targets {
            stats.merge(self.copy_formula(from, target)?);
        }
        Ok(stats)
    }

    /// Recompute every formula in dependency order
    pub fn recalculate_all(&mut self) -> CalculationStats {
        let mut stats = CalculationStats::default();

        // Formulas without references are not in the graph
        let mut constants: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(key, entry)| {
                entry.formula.is_some() && self.graph.precedents(**key).next().is_none()
            })
            .map(|(key, _)| *key)
            .collect();
        constants.sort_unstable();

        for key in constants.into_iter().chain(self.graph.get_full_order()) {
            if let Some(value) = self.recalculate_cell(key) {
                stats.record(&value);
            }
        }

        tracing::debug!(
            cells = stats.cells_calculated,
            errors = stats.errors,
            "full recalculation"
        );
        stats
    }

    /// Non-empty cells, ordered by column then row
    pub fn cells(&self) -> Vec<(CellKey, &Value)> {
        let mut cells: Vec<(CellKey, &Value)> = self
            .cells
            .iter()
            .map(|(key, entry)| (*key, &entry.value))
            .collect();
        cells.sort_unstable_by_key(|(key, _)| (key.col, key.row));
        cells
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    fn value_at(&self, key: CellKey) -> Value {
        self.cells
            .get(&key)
            .map(|entry| entry.value.clone())
            .unwrap_or_default()
    }

    fn set_formula(&mut self, key: CellKey, text: &str) -> Result<CalculationStats> {
        let ast = parse_formula(text)?;
        let precedents = collect_precedents(&ast, self.options.max_range_cells)?;

        if let Some(path) = self.graph.find_circular_path(key, &precedents) {
            let path = format_path(&path);
            tracing::warn!(cell = %key, path = %path, "circular reference rejected");
            return Err(Error::CircularReference { cell: key, path });
        }

        self.graph.update_dependencies(key, precedents)?;

        let value = evaluate(&ast, &*self);
        tracing::debug!(cell = %key, formula = text, value = %value, "formula committed");

        let mut stats = CalculationStats::default();
        stats.record(&value);
        self.cells.insert(
            key,
            CellEntry {
                value,
                formula: Some(FormulaCell {
                    text: text.to_string(),
                    ast,
                }),
            },
        );

        stats.merge(self.recalculate_dependents(key));
        Ok(stats)
    }

    fn set_literal(&mut self, key: CellKey, value: Option<Value>) -> CalculationStats {
        self.graph.clear(key);
        match value {
            Some(value) => {
                tracing::debug!(cell = %key, value = %value, "value committed");
                self.cells.insert(key, CellEntry { value, formula: None });
            }
            None => {
                tracing::debug!(cell = %key, "cell cleared");
                self.cells.remove(&key);
            }
        }
        self.recalculate_dependents(key)
    }

    fn recalculate_dependents(&mut self, changed: CellKey) -> CalculationStats {
        let mut stats = CalculationStats::default();
        if !self.options.recalculate_on_edit {
            return stats;
        }

        let order = self.graph.get_recalculation_order(changed);
        for key in &order {
            if let Some(value) = self.recalculate_cell(*key) {
                stats.record(&value);
            }
        }

        if !order.is_empty() {
            tracing::debug!(
                cell = %changed,
                recalculated = stats.cells_calculated,
                errors = stats.errors,
                "dependents recalculated"
            );
        }
        stats
    }

    /// Re-evaluate one formula cell; `None` when the cell holds no formula
    fn recalculate_cell(&mut self, key: CellKey) -> Option<Value> {
        let value = {
            let formula = self.cells.get(&key)?.formula.as_ref()?;
            evaluate(&formula.ast, &*self)
        };

        let entry = self.cells.get_mut(&key)?;
        entry.value = value.clone();
        Some(value)
    }
}

impl EvaluationContext for Spreadsheet {
    fn get_cell_value(&self, addr: CellAddress) -> Value {
        self.value_at(CellKey::from(addr))
    }
}

/// Interpret non-formula input; `None` means the cell is cleared
fn parse_literal(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.eq_ignore_ascii_case("TRUE") {
        return Some(Value::Boolean(true));
    }
    if trimmed.eq_ignore_ascii_case("FALSE") {
        return Some(Value::Boolean(false));
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(Value::Number(n)),
        _ => Some(Value::text(input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellError, FormulaError};
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal(""), None);
        assert_eq!(parse_literal("   "), None);
        assert_eq!(parse_literal("42"), Some(Value::Number(42.0)));
        assert_eq!(parse_literal(" -1.5e2 "), Some(Value::Number(-150.0)));
        assert_eq!(parse_literal("true"), Some(Value::Boolean(true)));
        assert_eq!(parse_literal("False"), Some(Value::Boolean(false)));
        assert_eq!(parse_literal("hello"), Some(Value::text("hello")));
        assert_eq!(parse_literal("inf"), Some(Value::text("inf")));
        assert_eq!(parse_literal("NaN"), Some(Value::text("NaN")));
    }

    #[test]
    fn test_simple_calculation() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("A1", "10").unwrap();
        sheet.set_cell("A2", "20").unwrap();
        let stats = sheet.set_cell("A3", "=A1+A2").unwrap();

        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 0);
        assert_eq!(sheet.value("A3").unwrap(), Value::Number(30.0));
        assert_eq!(sheet.formula("A3").unwrap().as_deref(), Some("=A1+A2"));
        assert_eq!(sheet.formula("A1").unwrap(), None);
    }

    #[test]
    fn test_edit_propagates() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("A1", "1").unwrap();
        sheet.set_cell("B1", "=A1*10").unwrap();
        sheet.set_cell("C1", "=B1+1").unwrap();

        let stats = sheet.set_cell("A1", "2").unwrap();
        assert_eq!(stats.cells_calculated, 2);
        assert_eq!(sheet.value("B1").unwrap(), Value::Number(20.0));
        assert_eq!(sheet.value("C1").unwrap(), Value::Number(21.0));
    }

    #[test]
    fn test_error_stats() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("A1", "=1/B1").unwrap();
        sheet.set_cell("A2", "=A1+1").unwrap();

        let stats = sheet.set_cell("B1", "0").unwrap();
        assert_eq!(stats, CalculationStats { cells_calculated: 2, errors: 2 });
        assert_eq!(sheet.value("A2").unwrap().error_kind(), Some(CellError::Div0));
    }

    #[test]
    fn test_cycle_rejected_atomically() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("A1", "5").unwrap();
        sheet.set_cell("B1", "=A1").unwrap();
        let graph_before = sheet.dependency_graph().clone();

        let err = sheet.set_cell("A1", "=B1").unwrap_err();
        assert_eq!(
            err,
            Error::CircularReference {
                cell: key("A1"),
                path: "A1 -> B1 -> A1".into()
            }
        );
        assert_eq!(sheet.value("A1").unwrap(), Value::Number(5.0));
        assert_eq!(sheet.formula("A1").unwrap(), None);
        assert_eq!(sheet.dependency_graph(), &graph_before);
    }

    #[test]
    fn test_syntax_error_leaves_cell() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("A1", "=1+2").unwrap();

        let err = sheet.set_cell("A1", "=1+").unwrap_err();
        assert!(matches!(err, Error::Formula(FormulaError::Syntax { .. })));
        assert_eq!(sheet.value("A1").unwrap(), Value::Number(3.0));
        assert_eq!(sheet.formula("A1").unwrap().as_deref(), Some("=1+2"));
    }

    #[test]
    fn test_range_limit() {
        let mut sheet = Spreadsheet::with_options(CalculationOptions {
            max_range_cells: 10,
            ..CalculationOptions::default()
        });
        assert!(sheet.set_cell("B1", "=SUM(A1:A10)").is_ok());
        assert!(matches!(
            sheet.set_cell("B2", "=SUM(A1:A11)"),
            Err(Error::Formula(FormulaError::RangeTooLarge { cells: 11, .. }))
        ));
    }

    #[test]
    fn test_bad_address() {
        let mut sheet = Spreadsheet::new();
        assert!(matches!(sheet.set_cell("1A", "1"), Err(Error::Address(_))));
        assert!(matches!(sheet.value(""), Err(Error::Address(_))));
    }

    #[test]
    fn test_deferred_recalculation() {
        let mut sheet = Spreadsheet::with_options(CalculationOptions {
            recalculate_on_edit: false,
            ..CalculationOptions::default()
        });
        sheet.set_cell("A1", "1").unwrap();
        sheet.set_cell("A2", "=A1+1").unwrap();
        sheet.set_cell("A3", "=7").unwrap();

        let stats = sheet.set_cell("A1", "10").unwrap();
        assert_eq!(stats.cells_calculated, 0);
        assert_eq!(sheet.value("A2").unwrap(), Value::Number(2.0));

        let stats = sheet.recalculate_all();
        assert_eq!(stats.cells_calculated, 2);
        assert_eq!(sheet.value("A2").unwrap(), Value::Number(11.0));
        assert_eq!(sheet.value("A3").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_cells_column_major() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell("B1", "x").unwrap();
        sheet.set_cell("A2", "2").unwrap();
        sheet.set_cell("A1", "1").unwrap();

        let cells: Vec<String> = sheet.cells().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(cells, vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn test_accepts_addresses_and_keys() {
        let mut sheet = Spreadsheet::new();
        sheet.set_cell(CellAddress::new(0, 0), "3").unwrap();
        sheet.set_cell(key("B1"), "=A1*2").unwrap();
        assert_eq!(sheet.value(String::from("b1")).unwrap(), Value::Number(6.0));
        assert_eq!(sheet.value("$B$1").unwrap(), Value::Number(6.0));
    }
}
