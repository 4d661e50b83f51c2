//! Math and aggregate functions

use super::{arg, referenced_values};
use crate::ast::FormulaExpr;
use crate::evaluator::{finite, Evaluator};
use sheetcalc_core::{CellError, ErrorValue, Value};

/// Numbers an aggregate sees across its arguments.
///
/// Literal arguments are coerced (`"3"` and TRUE count); cells read through a
/// reference contribute only when they hold numbers. Errors propagate.
fn collect_numbers(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Result<Vec<f64>, ErrorValue> {
    let mut numbers = Vec::new();

    for arg in args {
        match referenced_values(arg, ev) {
            Some(values) => {
                for value in values {
                    match value {
                        Value::Number(n) => numbers.push(n),
                        Value::Error(e) => return Err(e),
                        _ => {} // Ignore non-numeric
                    }
                }
            }
            None => numbers.push(ev.number(arg)?),
        }
    }

    Ok(numbers)
}

fn aggregate(
    args: &[FormulaExpr],
    ev: &Evaluator<'_>,
    reduce: impl FnOnce(Vec<f64>) -> Value,
) -> Value {
    match collect_numbers(args, ev) {
        Ok(numbers) => reduce(numbers),
        Err(e) => Value::Error(e),
    }
}

/// SUM function
pub fn fn_sum(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    aggregate(args, ev, |numbers| finite(numbers.iter().sum()))
}

/// PRODUCT function; 0 when no numbers are found
pub fn fn_product(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    aggregate(args, ev, |numbers| {
        if numbers.is_empty() {
            Value::Number(0.0)
        } else {
            finite(numbers.iter().product())
        }
    })
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    aggregate(args, ev, |numbers| {
        if numbers.is_empty() {
            Value::error(CellError::Div0)
        } else {
            finite(numbers.iter().sum::<f64>() / numbers.len() as f64)
        }
    })
}

/// MIN function
pub fn fn_min(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    aggregate(args, ev, |numbers| {
        Value::Number(numbers.into_iter().reduce(f64::min).unwrap_or(0.0))
    })
}

/// MAX function
pub fn fn_max(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    aggregate(args, ev, |numbers| {
        Value::Number(numbers.into_iter().reduce(f64::max).unwrap_or(0.0))
    })
}

/// COUNT function - counts numbers. Errors are counted as "not a number".
pub fn fn_count(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let mut count = 0usize;

    for arg in args {
        match referenced_values(arg, ev) {
            Some(values) => {
                count += values
                    .iter()
                    .filter(|v| matches!(v, Value::Number(_)))
                    .count()
            }
            None => {
                if ev.number(arg).is_ok() {
                    count += 1;
                }
            }
        }
    }

    Value::Number(count as f64)
}

/// COUNTA function - counts non-empty values
pub fn fn_counta(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let mut count = 0usize;

    for arg in args {
        match referenced_values(arg, ev) {
            Some(values) => count += values.iter().filter(|v| !v.is_empty()).count(),
            // A literal argument is always a value
            None => count += 1,
        }
    }

    Value::Number(count as f64)
}

/// COUNTBLANK function - counts empty cells and empty text in a reference
pub fn fn_countblank(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let target = match arg(args, 0) {
        Ok(target) => target,
        Err(e) => return Value::Error(e),
    };
    let Some(values) = referenced_values(target, ev) else {
        return Value::error_with_detail(CellError::Value, "COUNTBLANK expects a reference");
    };

    let count = values
        .iter()
        .filter(|v| match v {
            Value::Empty => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        })
        .count();

    Value::Number(count as f64)
}

/// ABS function
pub fn fn_abs(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|number| ev.number(number))
        .map(|n| Value::Number(n.abs()))
        .unwrap_or_else(Value::Error)
}

/// ROUND(number, [digits]) - rounds half away from zero.
/// Negative digits round to the left of the decimal point.
pub fn fn_round(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let round = || -> Result<Value, ErrorValue> {
        let number = ev.number(arg(args, 0)?)?;
        let digits = match args.get(1) {
            Some(arg) => ev.number(arg)?.trunc(),
            None => 0.0,
        };

        let multiplier = 10_f64.powf(digits.abs());
        if !multiplier.is_finite() {
            return Ok(Value::Number(if digits > 0.0 { number } else { 0.0 }));
        }

        // f64::round already rounds half away from zero
        let rounded = if digits >= 0.0 {
            (number * multiplier).round() / multiplier
        } else {
            (number / multiplier).round() * multiplier
        };
        Ok(finite(rounded))
    };

    round().unwrap_or_else(Value::Error)
}

/// INT function - rounds down to the nearest integer
pub fn fn_int(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|number| ev.number(number))
        .map(|n| Value::Number(n.floor()))
        .unwrap_or_else(Value::Error)
}

/// MOD(number, divisor) - the result has the sign of the divisor
pub fn fn_mod(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let modulo = || -> Result<Value, ErrorValue> {
        let number = ev.number(arg(args, 0)?)?;
        let divisor = ev.number(arg(args, 1)?)?;
        if divisor == 0.0 {
            return Ok(Value::error(CellError::Div0));
        }
        Ok(finite(number - divisor * (number / divisor).floor()))
    };

    modulo().unwrap_or_else(Value::Error)
}

/// SQRT function
pub fn fn_sqrt(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    match arg(args, 0).and_then(|number| ev.number(number)) {
        Ok(n) if n < 0.0 => Value::error_with_detail(CellError::Num, "square root of a negative number"),
        Ok(n) => Value::Number(n.sqrt()),
        Err(e) => Value::Error(e),
    }
}

/// POWER function
pub fn fn_power(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    let power = || -> Result<Value, ErrorValue> {
        let base = ev.number(arg(args, 0)?)?;
        let exponent = ev.number(arg(args, 1)?)?;
        Ok(finite(base.powf(exponent)))
    };

    power().unwrap_or_else(Value::Error)
}

/// SIGN function
pub fn fn_sign(args: &[FormulaExpr], ev: &Evaluator<'_>) -> Value {
    arg(args, 0)
        .and_then(|number| ev.number(number))
        .map(|n| {
            Value::Number(if n > 0.0 {
                1.0
            } else if n < 0.0 {
                -1.0
            } else {
                0.0
            })
        })
        .unwrap_or_else(Value::Error)
}

#[cfg(test)]
mod tests {
    use crate::functions::testing::{eval, eval_with};
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{CellError, Value};

    fn column_a() -> Vec<(&'static str, Value)> {
        vec![
            ("A1", Value::Number(1.0)),
            ("A2", Value::Number(2.0)),
            ("A3", Value::text("three")),
            ("A4", Value::Boolean(true)),
            ("A5", Value::Number(4.0)),
        ]
    }

    #[test]
    fn test_sum() {
        assert_eq!(eval("=SUM(1,2,3)"), Value::Number(6.0));
        assert_eq!(eval_with("=SUM(A1:A6)", &column_a()), Value::Number(7.0));
        assert_eq!(eval_with("=SUM(A1:A2,10)", &column_a()), Value::Number(13.0));
    }

    #[test]
    fn test_literal_arguments_are_coerced() {
        assert_eq!(eval("=SUM(\"2\",TRUE)"), Value::Number(3.0));
        assert_eq!(eval("=SUM(\"x\")").error_kind(), Some(CellError::Value));
        // Referenced text and booleans are skipped
        assert_eq!(eval_with("=SUM(A3,A4,A5)", &column_a()), Value::Number(4.0));
    }

    #[test]
    fn test_aggregate_error_propagation() {
        let cells = [("A1", Value::Number(1.0)), ("A2", Value::error(CellError::Na))];
        assert_eq!(eval_with("=SUM(A1:A2)", &cells).error_kind(), Some(CellError::Na));
        assert_eq!(eval("=MAX(1,1/0)").error_kind(), Some(CellError::Div0));
    }

    #[test]
    fn test_product() {
        assert_eq!(eval("=PRODUCT(2,3,4)"), Value::Number(24.0));
        assert_eq!(eval("=PRODUCT(A1:A3)"), Value::Number(0.0));
    }

    #[test]
    fn test_average() {
        assert_eq!(eval_with("=AVERAGE(A1:A5)", &column_a()), Value::Number(7.0 / 3.0));
        assert_eq!(eval("=AVERAGE(A1:A3)").error_kind(), Some(CellError::Div0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(eval("=MIN(3,1,2)"), Value::Number(1.0));
        assert_eq!(eval("=MAX(3,1,2)"), Value::Number(3.0));
        assert_eq!(eval_with("=MAX(A1:A5)", &column_a()), Value::Number(4.0));
        assert_eq!(eval("=MIN(B1:B3)"), Value::Number(0.0));
    }

    #[test]
    fn test_counting() {
        assert_eq!(eval_with("=COUNT(A1:A6)", &column_a()), Value::Number(3.0));
        assert_eq!(eval_with("=COUNTA(A1:A6)", &column_a()), Value::Number(5.0));
        assert_eq!(eval_with("=COUNTBLANK(A1:A6)", &column_a()), Value::Number(1.0));
        assert_eq!(eval("=COUNT(1,\"2\",\"x\",1/0)"), Value::Number(2.0));
        assert_eq!(eval("=COUNTA(1,\"\")"), Value::Number(2.0));
        assert_eq!(eval("=COUNTBLANK(5)").error_kind(), Some(CellError::Value));
    }

    #[test]
    fn test_abs_int_sign() {
        assert_eq!(eval("=ABS(-5)"), Value::Number(5.0));
        assert_eq!(eval("=INT(-2.5)"), Value::Number(-3.0));
        assert_eq!(eval("=INT(2.9)"), Value::Number(2.0));
        assert_eq!(eval("=SIGN(-0.1)"), Value::Number(-1.0));
        assert_eq!(eval("=SIGN(0)"), Value::Number(0.0));
        assert_eq!(eval("=ABS(A1:A2)").error_kind(), Some(CellError::Value));
    }

    #[test]
    fn test_round() {
        assert_eq!(eval("=ROUND(2.5)"), Value::Number(3.0));
        assert_eq!(eval("=ROUND(-2.5)"), Value::Number(-3.0));
        assert_eq!(eval("=ROUND(3.14159,2)"), Value::Number(3.14));
        assert_eq!(eval("=ROUND(1234,-2)"), Value::Number(1200.0));
        assert_eq!(eval("=ROUND(1.5,400)"), Value::Number(1.5));
    }

    #[test]
    fn test_mod() {
        assert_eq!(eval("=MOD(10,3)"), Value::Number(1.0));
        assert_eq!(eval("=MOD(-10,3)"), Value::Number(2.0));
        assert_eq!(eval("=MOD(10,-3)"), Value::Number(-2.0));
        assert_eq!(eval("=MOD(1,0)").error_kind(), Some(CellError::Div0));
    }

    #[test]
    fn test_sqrt_power() {
        assert_eq!(eval("=SQRT(16)"), Value::Number(4.0));
        assert_eq!(eval("=SQRT(-1)").error_kind(), Some(CellError::Num));
        assert_eq!(eval("=POWER(2,8)"), Value::Number(256.0));
        assert_eq!(eval("=POWER(0,-1)").error_kind(), Some(CellError::Num));
    }
}
