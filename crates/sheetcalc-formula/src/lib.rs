//! # sheetcalc-formula
//!
//! Formula language and dependency tracking for sheetcalc.
//!
//! This crate provides:
//! - Tokenizing and parsing (text → AST)
//! - Evaluation (AST → value) against a host-supplied [`EvaluationContext`]
//! - Built-in functions (math, logical, text, info)
//! - Dependency tracking for recalculation chains, with cycle detection
//! - Reference extraction and formula shifting for copy/fill
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_formula::{evaluate, parse_formula, EvaluationContext};
//! use sheetcalc_core::{CellAddress, Value};
//!
//! struct Ten;
//!
//! impl EvaluationContext for Ten {
//!     fn get_cell_value(&self, _addr: CellAddress) -> Value {
//!         Value::Number(10.0)
//!     }
//! }
//!
//! let ast = parse_formula("=SUM(A1:A3)/2").unwrap();
//! assert_eq!(evaluate(&ast, &Ten), Value::Number(15.0));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod references;
pub mod tokenizer;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::{CellKey, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{default_registry, evaluate, Argument, EmptyContext, EvaluationContext, Evaluator};
pub use functions::{FunctionDef, FunctionRegistry};
pub use parser::{parse_expression, parse_formula, parse_tokens};
pub use references::{collect_precedents, shift_formula, DEFAULT_MAX_RANGE_CELLS};
pub use tokenizer::{tokenize, Token, TokenKind, Tokenizer};
