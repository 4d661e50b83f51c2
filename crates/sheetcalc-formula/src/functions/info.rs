//! Information functions

use super::arg;
use crate::ast::FormulaExpr;
use crate::evaluator::{Argument, Evaluator};
use sheetcalc_core::{CellError, ErrorValue, Value};

/// The single value an IS* function inspects; a range reads as #VALUE!
fn inspected(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Result<Value, ErrorValue> {
    Ok(match ev.argument(arg(args, 0)?) {
        Argument::Scalar(value) => value,
        Argument::Range(_) => Value::error(CellError::Value),
    })
}

fn is(args: &[FormulaExpr], ev: &Evaluator<'_>, test: impl FnOnce(&Value) -> bool) -> Value {
    inspected(args, ev)
        .map(|value| Value::Boolean(test(&value)))
        .unwrap_or_else(Value::Error)
}

/// ISBLANK function
pub fn fn_isblank(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    is(args, ev, Value::is_empty)
}

/// ISNUMBER function
pub fn fn_isnumber(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    is(args, ev, |value| matches!(value, Value::Number(_)))
}

/// ISTEXT function
pub fn fn_istext(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    is(args, ev, |value| matches!(value, Value::Text(_)))
}

/// ISERROR function
pub fn fn_iserror(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    is(args, ev, Value::is_error)
}

/// NA function
pub fn fn_na(_args: &[FormulaExpr], _ev: &Evaluator<'_>) -> Value {
    Value::error(CellError::Na)
}
