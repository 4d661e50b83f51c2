//! Text functions
//!
//! Lengths and positions count characters, not bytes.

use super::arg;
use crate::ast::FormulaExpr;
use crate::evaluator::{Argument, Evaluator};
use sheetcalc_core::{CellError, ErrorValue, Value};

/// CONCAT / CONCATENATE - joins all arguments, ranges included
pub fn fn_concat(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let mut result = String::new();

    for arg in args {
        match ev.argument(arg) {
            Argument::Scalar(value) => match value.to_text() {
                Ok(s) => result.push_str(&s),
                Err(e) => return Value::Error(e),
            },
            Argument::Range(values) => {
                for value in values {
                    match value.to_text() {
                        Ok(s) => result.push_str(&s),
                        Err(e) => return Value::Error(e),
                    }
                }
            }
        }
    }

    Value::Text(result)
}

/// LEN function
pub fn fn_len(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|text| ev.text(text))
        .map(|s| Value::Number(s.chars().count() as f64))
        .unwrap_or_else(Value::Error)
}

/// Optional character count argument (default 1); negative counts are #VALUE!
fn char_count(count: Option<&FormulaExpr>, ev: &Evaluator<'_>) -> Result<usize, ErrorValue> {
    let Some(count) = count else {
        return Ok(1);
    };

    let n = ev.number(count)?.trunc();
    if n < 0.0 {
        return Err(ErrorValue::with_detail(
            CellError::Value,
            "character count must not be negative",
        ));
    }
    Ok(n as usize)
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let left = || -> Result<Value, ErrorValue> {
        let text = ev.text(arg(args, 0)?)?;
        let n = char_count(args.get(1), ev)?;
        Ok(Value::Text(text.chars().take(n).collect()))
    };

    left().unwrap_or_else(Value::Error)
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let right = || -> Result<Value, ErrorValue> {
        let text = ev.text(arg(args, 0)?)?;
        let n = char_count(args.get(1), ev)?;
        let len = text.chars().count();
        Ok(Value::Text(text.chars().skip(len.saturating_sub(n)).collect()))
    };

    right().unwrap_or_else(Value::Error)
}

/// MID(text, start, num_chars) - `start` is 1-based
pub fn fn_mid(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let mid = || -> Result<Value, ErrorValue> {
        let text = ev.text(arg(args, 0)?)?;
        let start = ev.number(arg(args, 1)?)?.trunc();
        let n = char_count(Some(arg(args, 2)?), ev)?;

        if start < 1.0 {
            return Err(ErrorValue::with_detail(
                CellError::Value,
                "start position must be at least 1",
            ));
        }

        Ok(Value::Text(
            text.chars().skip(start as usize - 1).take(n).collect(),
        ))
    };

    mid().unwrap_or_else(Value::Error)
}

/// UPPER function
pub fn fn_upper(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|text| ev.text(text))
        .map(|s| Value::Text(s.to_uppercase()))
        .unwrap_or_else(Value::Error)
}

/// LOWER function
pub fn fn_lower(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|text| ev.text(text))
        .map(|s| Value::Text(s.to_lowercase()))
        .unwrap_or_else(Value::Error)
}

/// TRIM - strips leading and trailing spaces and collapses runs of
/// whitespace inside the text to one space
pub fn fn_trim(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|text| ev.text(text))
        .map(|s| Value::Text(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        .unwrap_or_else(Value::Error)
}
