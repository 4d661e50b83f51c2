//! Formula evaluator
//!
//! Walks a formula AST against host-supplied cell lookups. Evaluation never
//! fails: every problem surfaces as a [`Value::Error`].

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::functions::FunctionRegistry;
use sheetcalc_core::{CellAddress, CellError, CellRange, ErrorValue, Value};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The registry holding every built-in function
pub fn default_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Cell lookups the evaluator needs from its host.
///
/// Lookups are synchronous in-memory reads.
pub trait EvaluationContext {
    /// Current value of a cell; `Value::Empty` when unset
    fn get_cell_value(&self, addr: CellAddress) -> Value;

    /// Values of a rectangular block in column-major order (each column top
    /// to bottom, columns left to right)
    fn get_range_values(&self, start: CellAddress, end: CellAddress) -> Vec<Value> {
        CellRange::new(start, end)
            .cells()
            .map(|addr| self.get_cell_value(addr))
            .collect()
    }
}

/// Context with no cells; every reference reads as empty
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl EvaluationContext for EmptyContext {
    fn get_cell_value(&self, _addr: CellAddress) -> Value {
        Value::Empty
    }
}

/// A function argument after evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Any non-range expression
    Scalar(Value),
    /// A range written directly as the argument, expanded column-major
    Range(Vec<Value>),
}

/// Evaluate an expression against `ctx` with the built-in functions
///
/// # Example
/// ```rust
/// use sheetcalc_formula::{evaluate, parse_formula, EmptyContext};
/// use sheetcalc_core::Value;
///
/// let ast = parse_formula("=SUM(1,2)*2").unwrap();
/// assert_eq!(evaluate(&ast, &EmptyContext), Value::Number(6.0));
/// ```
pub fn evaluate(expr: &FormulaExpr, ctx: &dyn EvaluationContext) -> Value {
    Evaluator::new(ctx, default_registry()).evaluate(expr)
}

/// Tree-walking interpreter
///
/// Function implementations receive the evaluator together with their raw
/// argument expressions, and force only the arguments they need.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    context: &'a dyn EvaluationContext,
    registry: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a dyn EvaluationContext, registry: &'a FunctionRegistry) -> Self {
        Self { context, registry }
    }

    pub fn context(&self) -> &'a dyn EvaluationContext {
        self.context
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    /// Evaluate an expression to a value
    pub fn evaluate(&self, expr: &FormulaExpr) -> Value {
        match expr {
            // === Literals ===
            FormulaExpr::Number(n) => Value::Number(*n),
            FormulaExpr::String(s) => Value::Text(s.clone()),
            FormulaExpr::Boolean(b) => Value::Boolean(*b),

            // === References ===
            FormulaExpr::CellRef(addr) => self.context.get_cell_value(*addr),

            // Only valid as a direct function argument
            FormulaExpr::Range { start, end } => Value::error_with_detail(
                CellError::Ref,
                format!("range {}:{} used where a single value is expected", start, end),
            ),

            FormulaExpr::Name(name) => {
                Value::error_with_detail(CellError::Name, format!("unknown name {}", name))
            }

            // === Operators ===
            FormulaExpr::Group(inner) => self.evaluate(inner),

            FormulaExpr::BinaryOp { op, left, right } => self.evaluate_binary_op(*op, left, right),

            FormulaExpr::UnaryOp { op, operand } => self.evaluate_unary_op(*op, operand),

            // === Functions ===
            FormulaExpr::Function { name, args } => self.evaluate_function(name, args),
        }
    }

    // === Argument helpers for function implementations ===

    /// Evaluate an argument, expanding a directly written range
    pub fn argument(&self, expr: &FormulaExpr) -> Argument {
        match expr.as_range() {
            Some(range) => Argument::Range(self.context.get_range_values(range.start, range.end)),
            None => Argument::Scalar(self.evaluate(expr)),
        }
    }

    /// Evaluate an argument that must be a single non-error value
    pub fn scalar(&self, expr: &FormulaExpr) -> Result<Value, ErrorValue> {
        match self.argument(expr) {
            Argument::Range(_) => Err(ErrorValue::with_detail(
                CellError::Value,
                "expected a single value, got a range",
            )),
            Argument::Scalar(Value::Error(e)) => Err(e),
            Argument::Scalar(value) => Ok(value),
        }
    }

    /// Evaluate an argument and coerce it to a number
    pub fn number(&self, expr: &FormulaExpr) -> Result<f64, ErrorValue> {
        self.scalar(expr)?.to_number()
    }

    /// Evaluate an argument and coerce it to text
    pub fn text(&self, expr: &FormulaExpr) -> Result<String, ErrorValue> {
        self.scalar(expr)?.to_text()
    }

    /// Evaluate an argument and coerce it to a boolean
    pub fn boolean(&self, expr: &FormulaExpr) -> Result<bool, ErrorValue> {
        self.scalar(expr)?.to_bool()
    }

    // === Operators ===

    fn evaluate_binary_op(&self, op: BinaryOperator, left: &FormulaExpr, right: &FormulaExpr) -> Value {
        // Evaluate operands first
        let left_val = self.evaluate(left);
        let right_val = self.evaluate(right);

        // Propagate errors, leftmost first
        if left_val.is_error() {
            return left_val;
        }
        if right_val.is_error() {
            return right_val;
        }

        match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Power => arithmetic(op, &left_val, &right_val),

            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => {
                let ordering = left_val.compare(&right_val);
                Value::Boolean(match op {
                    BinaryOperator::Equal => ordering == Ordering::Equal,
                    BinaryOperator::NotEqual => ordering != Ordering::Equal,
                    BinaryOperator::LessThan => ordering == Ordering::Less,
                    BinaryOperator::LessEqual => ordering != Ordering::Greater,
                    BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })
            }

            BinaryOperator::Concat => match (left_val.to_text(), right_val.to_text()) {
                (Ok(l), Ok(r)) => Value::Text(l + &r),
                (Err(e), _) | (_, Err(e)) => Value::Error(e),
            },
        }
    }

    fn evaluate_unary_op(&self, op: UnaryOperator, operand: &FormulaExpr) -> Value {
        let val = self.evaluate(operand);

        match op {
            UnaryOperator::Negate => match val.to_number() {
                Ok(n) => finite(-n),
                Err(e) => Value::Error(e),
            },
            // Unary plus leaves its operand alone
            UnaryOperator::Plus => val,
        }
    }

    // === Functions ===

    fn evaluate_function(&self, name: &str, args: &[FormulaExpr]) -> Value {
        let Some(func) = self.registry.get(name) else {
            tracing::trace!(function = name, "unknown function");
            return Value::error_with_detail(CellError::Name, name.to_uppercase());
        };

        // Check argument count
        if args.len() < func.min_args {
            return Value::error_with_detail(
                CellError::Value,
                format!(
                    "{} expects at least {} argument(s), got {}",
                    func.name,
                    func.min_args,
                    args.len()
                ),
            );
        }

        if let Some(max) = func.max_args {
            if args.len() > max {
                return Value::error_with_detail(
                    CellError::Value,
                    format!(
                        "{} expects at most {} argument(s), got {}",
                        func.name,
                        max,
                        args.len()
                    ),
                );
            }
        }

        (func.implementation)(args, self)
    }
}

/// Numeric binary operation on two non-error operands
fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    let (l, r) = match (left.to_number(), right.to_number()) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return Value::Error(e),
    };

    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Value::error(CellError::Div0);
            }
            l / r
        }
        _ => l.powf(r),
    };

    finite(result)
}

/// Wrap a numeric result, mapping NaN and infinities to `#NUM!`
pub(crate) fn finite(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::error(CellError::Num)
    }
}
