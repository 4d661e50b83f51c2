//! Reference extraction and formula shifting

use crate::ast::FormulaExpr;
use crate::dependency::CellKey;
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{TokenKind, Tokenizer};
use ahash::AHashSet;
use sheetcalc_core::CellAddress;

/// Default cap on the cells a single range may contribute to the graph
/// (one full column)
pub const DEFAULT_MAX_RANGE_CELLS: u64 = sheetcalc_core::MAX_ROWS as u64;

/// Cells a formula reads, in first-seen order without duplicates.
///
/// Ranges are expanded cell by cell; a range with more than
/// `max_range_cells` cells fails with [`FormulaError::RangeTooLarge`].
///
/// # Example
/// ```rust
/// use sheetcalc_formula::{collect_precedents, parse_formula, DEFAULT_MAX_RANGE_CELLS};
///
/// let ast = parse_formula("=SUM(A1:A2)+A1*$B$1").unwrap();
/// let cells: Vec<String> = collect_precedents(&ast, DEFAULT_MAX_RANGE_CELLS)
///     .unwrap()
///     .iter()
///     .map(|k| k.to_string())
///     .collect();
/// assert_eq!(cells, ["A1", "A2", "B1"]);
/// ```
pub fn collect_precedents(expr: &FormulaExpr, max_range_cells: u64) -> FormulaResult<Vec<CellKey>> {
    let mut collector = Collector {
        seen: AHashSet::new(),
        cells: Vec::new(),
        max_range_cells,
    };
    collector.visit(expr)?;
    Ok(collector.cells)
}

struct Collector {
    seen: AHashSet<CellKey>,
    cells: Vec<CellKey>,
    max_range_cells: u64,
}

impl Collector {
    fn push(&mut self, key: CellKey) {
        if self.seen.insert(key) {
            self.cells.push(key);
        }
    }

    fn visit(&mut self, expr: &FormulaExpr) -> FormulaResult<()> {
        match expr {
            FormulaExpr::CellRef(addr) => self.push(CellKey::from(addr)),

            FormulaExpr::Range { .. } => {
                if let Some(range) = expr.as_range() {
                    let cells = range.cell_count();
                    if cells > self.max_range_cells {
                        return Err(FormulaError::RangeTooLarge {
                            range: range.to_string(),
                            cells,
                            limit: self.max_range_cells,
                        });
                    }
                    for addr in range.cells() {
                        self.push(CellKey::from(addr));
                    }
                }
            }

            FormulaExpr::BinaryOp { left, right, .. } => {
                self.visit(left)?;
                self.visit(right)?;
            }

            FormulaExpr::UnaryOp { operand, .. } => self.visit(operand)?,

            FormulaExpr::Group(inner) => self.visit(inner)?,

            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    self.visit(arg)?;
                }
            }

            FormulaExpr::Number(_)
            | FormulaExpr::String(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Name(_) => {}
        }

        Ok(())
    }
}

/// Move every relative reference in a formula body by an offset.
///
/// Only cell reference tokens are rewritten (in normalized uppercase form);
/// all other text, spacing included, is kept as written. `$`-anchored
/// components stay put. A reference pushed off the grid fails with
/// [`FormulaError::InvalidReference`].
///
/// # Example
/// ```rust
/// use sheetcalc_formula::shift_formula;
///
/// let shifted = shift_formula("SUM(a1:$B$2) + A$1", 1, 1).unwrap();
/// assert_eq!(shifted, "SUM(B2:$B$2) + B$1");
/// ```
pub fn shift_formula(body: &str, row_delta: i64, col_delta: i64) -> FormulaResult<String> {
    let mut result = String::with_capacity(body.len());
    let mut copied_to = 0;

    for token in Tokenizer::new(body) {
        let token = token?;
        if token.kind != TokenKind::CellRef {
            continue;
        }

        let addr = CellAddress::parse(&token.value)
            .map_err(|e| FormulaError::InvalidReference(format!("'{}': {}", token.value, e)))?;
        let shifted = addr.shifted(row_delta, col_delta).ok_or_else(|| {
            FormulaError::InvalidReference(format!(
                "'{}' moved by ({}, {}) leaves the sheet",
                token.value, row_delta, col_delta
            ))
        })?;

        result.push_str(&body[copied_to..token.position]);
        result.push_str(&shifted.to_a1_string());
        copied_to = token.end;
    }

    result.push_str(&body[copied_to..]);
    Ok(result)
}
