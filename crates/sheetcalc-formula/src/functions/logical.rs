//! Logical functions
//!
//! IF, IFERROR and CHOOSE force only the argument they return.

use super::{arg, referenced_values};
use crate::ast::FormulaExpr;
use crate::evaluator::Evaluator;
use sheetcalc_core::{CellError, ErrorValue, Value};

/// IF(condition, then, [else]) - a missing else branch yields FALSE
pub fn fn_if(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let branch = || -> Result<Value, ErrorValue> {
        if ev.boolean(arg(args, 0)?)? {
            Ok(ev.evaluate(arg(args, 1)?))
        } else {
            Ok(match args.get(2) {
                Some(otherwise) => ev.evaluate(otherwise),
                None => Value::Boolean(false),
            })
        }
    };

    branch().unwrap_or_else(Value::Error)
}

/// IFERROR(value, fallback)
pub fn fn_iferror(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let caught = || -> Result<Value, ErrorValue> {
        let value = ev.evaluate(arg(args, 0)?);
        if value.is_error() {
            Ok(ev.evaluate(arg(args, 1)?))
        } else {
            Ok(value)
        }
    };

    caught().unwrap_or_else(Value::Error)
}

/// CHOOSE(index, value1, value2, ...)
pub fn fn_choose(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let index = match arg(args, 0).and_then(|index| ev.number(index)) {
        Ok(n) => n.trunc(),
        Err(e) => return Value::Error(e),
    };

    let choices = args.get(1..).unwrap_or_default();
    if index < 1.0 || index > choices.len() as f64 {
        return Value::error_with_detail(
            CellError::Value,
            format!("CHOOSE index {} is out of range 1..={}", index, choices.len()),
        );
    }

    ev.evaluate(&choices[index as usize - 1])
}

/// Logical values across arguments. Referenced text and empty cells are
/// skipped; literal arguments are coerced.
fn collect_logicals(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Result<Vec<bool>, ErrorValue> {
    let mut logicals = Vec::new();

    for arg in args {
        match referenced_values(arg, ev) {
            Some(values) => {
                for value in values {
                    match value {
                        Value::Boolean(b) => logicals.push(b),
                        Value::Number(n) => logicals.push(n != 0.0),
                        Value::Error(e) => return Err(e),
                        _ => {}
                    }
                }
            }
            None => logicals.push(ev.boolean(arg)?),
        }
    }

    if logicals.is_empty() {
        return Err(ErrorValue::with_detail(CellError::Value, "no logical values"));
    }

    Ok(logicals)
}

/// AND function
pub fn fn_and(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    collect_logicals(args, ev)
        .map(|values| Value::Boolean(values.into_iter().all(|b| b)))
        .unwrap_or_else(Value::Error)
}

/// OR function
pub fn fn_or(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    collect_logicals(args, ev)
        .map(|values| Value::Boolean(values.into_iter().any(|b| b)))
        .unwrap_or_else(Value::Error)
}

/// NOT function
pub fn fn_not(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|value| ev.boolean(value))
        .map(|b| Value::Boolean(!b))
        .unwrap_or_else(Value::Error)
}

/// TRUE function
pub fn fn_true(_args: &[FormulaExpr], _ev: &Evaluator<'_>) -> Value {
    Value::Boolean(true)
}

/// FALSE function
pub fn fn_false(_args: &[FormulaExpr], _ev: &Evaluator<'_>) -> Value {
    Value::Boolean(false)
}
