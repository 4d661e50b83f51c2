//! Cell value types

use std::cmp::Ordering;
use std::fmt;

/// The value of a cell, or the result of evaluating a formula.
///
/// Errors are ordinary values: they flow through operators and functions
/// instead of aborting evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Unset cell
    #[default]
    Empty,

    /// Numeric value
    Number(f64),

    /// Text value
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(ErrorValue),
}

impl Value {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Create an error value without detail
    pub fn error(kind: CellError) -> Self {
        Value::Error(ErrorValue::new(kind))
    }

    /// Create an error value carrying a short explanation
    pub fn error_with_detail<S: Into<String>>(kind: CellError, detail: S) -> Self {
        Value::Error(ErrorValue::with_detail(kind, detail))
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Get the error if this is one
    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Get the error kind if this is an error
    pub fn error_kind(&self) -> Option<CellError> {
        self.as_error().map(|e| e.kind)
    }

    /// Coerce to a number for arithmetic.
    ///
    /// Booleans count as 1/0, an empty cell as 0, and text must parse as a
    /// number. Errors are returned unchanged.
    pub fn to_number(&self) -> Result<f64, ErrorValue> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Empty => Ok(0.0),
            Value::Text(s) => match s.trim().parse::<f64>() {
                // "inf", "NaN" and overflowing literals are not numbers here
                Ok(n) if n.is_finite() => Ok(n),
                _ => Err(ErrorValue::with_detail(
                    CellError::Value,
                    format!("'{}' is not a number", s),
                )),
            },
            Value::Error(e) => Err(e.clone()),
        }
    }

    /// Coerce to a boolean for logical tests
    pub fn to_bool(&self) -> Result<bool, ErrorValue> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Empty => Ok(false),
            Value::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(ErrorValue::with_detail(
                        CellError::Value,
                        format!("'{}' is not a logical value", s),
                    ))
                }
            }
            Value::Error(e) => Err(e.clone()),
        }
    }

    /// Coerce to text for concatenation. An empty cell becomes `""`.
    pub fn to_text(&self) -> Result<String, ErrorValue> {
        match self {
            Value::Error(e) => Err(e.clone()),
            other => Ok(other.display_string()),
        }
    }

    /// The text shown for this value in a grid
    pub fn display_string(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Error(e) => e.kind.as_str().to_string(),
        }
    }

    /// Spreadsheet comparison: numbers numerically, text case-insensitively,
    /// FALSE < TRUE, and mixed types ordered Number < Text < Boolean.
    /// An empty cell compares as the zero value of the other side's type.
    ///
    /// Error operands must be handled by the caller.
    pub fn compare(&self, other: &Value) -> Ordering {
        let left = self.empty_as_zero_of(other);
        let right = other.empty_as_zero_of(self);

        match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
            (Value::Text(l), Value::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
            (Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
            _ => left.type_rank().cmp(&right.type_rank()),
        }
    }

    fn empty_as_zero_of(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Empty, Value::Text(_)) => Value::Text(String::new()),
            (Value::Empty, Value::Boolean(_)) => Value::Boolean(false),
            (Value::Empty, _) => Value::Number(0.0),
            (v, _) => v.clone(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Empty | Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Boolean(_) => 2,
            Value::Error(_) => 3,
        }
    }

    /// Get the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Error(_) => "error",
        }
    }
}

/// Format a number the way a grid shows it: integers without a fraction,
/// everything else with the shortest round-tripping representation.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<CellError> for Value {
    fn from(e: CellError) -> Self {
        Value::error(e)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(e)
    }
}

/// An error value: its kind plus an optional explanation.
///
/// Two errors of the same kind are equal when their details match too;
/// use [`ErrorValue::kind`] to compare kinds only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorValue {
    pub kind: CellError,
    pub detail: Option<String>,
}

impl ErrorValue {
    pub fn new(kind: CellError) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail<S: Into<String>>(kind: CellError, detail: S) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

impl From<CellError> for ErrorValue {
    fn from(kind: CellError) -> Self {
        ErrorValue::new(kind)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Error kinds a value can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand, or wrong argument count
    Value,
    /// #REF! - Invalid cell reference, or a range where a single value is needed
    Ref,
    /// #NAME? - Unrecognized function or name
    Name,
    /// #NUM! - Invalid numeric result
    Num,
    /// #N/A - Value not available
    Na,
    /// #CIRCULAR! - The formula would read its own result
    Circular,
}

impl CellError {
    /// Get the display mnemonic for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Circular => "#CIRCULAR!",
        }
    }

    /// Parse a display mnemonic (case-insensitive)
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            "#CIRCULAR!" => Some(CellError::Circular),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
