//! Built-in formula functions

pub mod info;
pub mod logical;
pub mod math;
pub mod text;

use crate::ast::FormulaExpr;
use crate::evaluator::Evaluator;
use ahash::AHashMap;
use sheetcalc_core::{CellError, ErrorValue, Value};

/// Function implementation signature
///
/// Implementations receive their argument expressions unevaluated, plus the
/// evaluator used to force them. Functions such as IF rely on this to skip
/// the branch they do not take.
///
/// The evaluator checks the call against `min_args`/`max_args` before
/// dispatch. Built-ins still read required arguments through [`arg`], so a
/// registry that lowers their bounds gets `#VALUE!` rather than a panic.
pub type FunctionImpl = fn(&[FormulaExpr], &Evaluator<'_>) -> Value;

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Function registry
///
/// Lookups are case-insensitive. The registry is read-only once evaluation
/// starts; build a custom one with [`FunctionRegistry::register`] first.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();

        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any function of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
        });

        // PRODUCT
        self.register(FunctionDef {
            name: "PRODUCT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_product,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_count,
        });

        // COUNTA
        self.register(FunctionDef {
            name: "COUNTA",
            min_args: 1,
            max_args: None,
            implementation: math::fn_counta,
        });

        // COUNTBLANK
        self.register(FunctionDef {
            name: "COUNTBLANK",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_countblank,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
        });

        // INT
        self.register(FunctionDef {
            name: "INT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_int,
        });

        // MOD
        self.register(FunctionDef {
            name: "MOD",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_mod,
        });

        // SQRT
        self.register(FunctionDef {
            name: "SQRT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sqrt,
        });

        // POWER
        self.register(FunctionDef {
            name: "POWER",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_power,
        });

        // SIGN
        self.register(FunctionDef {
            name: "SIGN",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sign,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_if,
        });

        // IFERROR
        self.register(FunctionDef {
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            implementation: logical::fn_iferror,
        });

        // CHOOSE
        self.register(FunctionDef {
            name: "CHOOSE",
            min_args: 2,
            max_args: None,
            implementation: logical::fn_choose,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
        });

        // TRUE
        self.register(FunctionDef {
            name: "TRUE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_true,
        });

        // FALSE
        self.register(FunctionDef {
            name: "FALSE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_false,
        });
    }

    fn register_text_functions(&mut self) {
        // CONCAT / CONCATENATE
        for name in ["CONCAT", "CONCATENATE"] {
            self.register(FunctionDef {
                name,
                min_args: 1,
                max_args: None,
                implementation: text::fn_concat,
            });
        }

        // LEN
        self.register(FunctionDef {
            name: "LEN",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_len,
        });

        // LEFT
        self.register(FunctionDef {
            name: "LEFT",
            min_args: 1,
            max_args: Some(2),
            implementation: text::fn_left,
        });

        // RIGHT
        self.register(FunctionDef {
            name: "RIGHT",
            min_args: 1,
            max_args: Some(2),
            implementation: text::fn_right,
        });

        // MID
        self.register(FunctionDef {
            name: "MID",
            min_args: 3,
            max_args: Some(3),
            implementation: text::fn_mid,
        });

        // UPPER
        self.register(FunctionDef {
            name: "UPPER",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_upper,
        });

        // LOWER
        self.register(FunctionDef {
            name: "LOWER",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_lower,
        });

        // TRIM
        self.register(FunctionDef {
            name: "TRIM",
            min_args: 1,
            max_args: Some(1),
            implementation: text::fn_trim,
        });
    }

    fn register_info_functions(&mut self) {
        // ISBLANK
        self.register(FunctionDef {
            name: "ISBLANK",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_isblank,
        });

        // ISNUMBER
        self.register(FunctionDef {
            name: "ISNUMBER",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_isnumber,
        });

        // ISTEXT
        self.register(FunctionDef {
            name: "ISTEXT",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_istext,
        });

        // ISERROR
        self.register(FunctionDef {
            name: "ISERROR",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_iserror,
        });

        // NA
        self.register(FunctionDef {
            name: "NA",
            min_args: 0,
            max_args: Some(0),
            implementation: info::fn_na,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The argument at `index`, or `#VALUE!` when the call is short of it
pub fn arg(args: &[FormulaExpr], index: usize) -> Result<&FormulaExpr, ErrorValue> {
    args.get(index).ok_or_else(|| {
        ErrorValue::with_detail(CellError::Value, format!("missing argument {}", index + 1))
    })
}

/// Values read through a reference argument (a range or a single cell), or
/// `None` for any other expression.
///
/// Aggregates treat referenced cells differently from literal arguments:
/// text and booleans in cells are skipped instead of coerced.
pub(crate) fn referenced_values(arg: &FormulaExpr, ev: &Evaluator<'_>) -> Option<Vec<Value>> {
    match arg {
        FormulaExpr::Range { .. } => match ev.argument(arg) {
            crate::evaluator::Argument::Range(values) => Some(values),
            crate::evaluator::Argument::Scalar(value) => Some(vec![value]),
        },
        FormulaExpr::CellRef(_) => Some(vec![ev.evaluate(arg)]),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::evaluator::{evaluate, EvaluationContext};
    use crate::parser::parse_formula;
    use sheetcalc_core::{CellAddress, Value};
    use std::collections::HashMap;

    struct Sheet(HashMap<CellAddress, Value>);

    impl EvaluationContext for Sheet {
        fn get_cell_value(&self, addr: CellAddress) -> Value {
            self.0.get(&addr.to_relative()).cloned().unwrap_or_default()
        }
    }

    /// Evaluate a formula with every cell empty
    pub(crate) fn eval(formula: &str) -> Value {
        eval_with(formula, &[])
    }

    /// Evaluate a formula over the given cell values
    pub(crate) fn eval_with(formula: &str, cells: &[(&str, Value)]) -> Value {
        let sheet = Sheet(
            cells
                .iter()
                .map(|(addr, value)| (CellAddress::parse(addr).unwrap(), value.clone()))
                .collect(),
        );
        evaluate(&parse_formula(formula).unwrap(), &sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("sum").map(|f| f.name), Some("SUM"));
        assert_eq!(registry.get("IfError").map(|f| f.name), Some("IFERROR"));
        assert!(registry.get("VLOOKUP").is_none());
    }

    #[test]
    fn test_builtin_arity() {
        let registry = FunctionRegistry::new();
        let def = registry.get("IF").unwrap();
        assert_eq!((def.min_args, def.max_args), (2, Some(3)));
        let def = registry.get("SUM").unwrap();
        assert_eq!((def.min_args, def.max_args), (1, None));
    }

    #[test]
    fn test_names_sorted() {
        let registry = FunctionRegistry::new();
        let names = registry.names();
        assert_eq!(names.len(), registry.len());
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        assert!(names.contains(&"CONCATENATE"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = FunctionRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.get("SUM").is_none());
    }

    #[test]
    fn test_loosened_arity_yields_value_error() {
        use crate::evaluator::EmptyContext;
        use crate::parser::parse_formula;
        use sheetcalc_core::CellError;

        let builtins = FunctionRegistry::new();
        let mut loose = FunctionRegistry::empty();
        for name in builtins.names() {
            if let Some(def) = builtins.get(name) {
                loose.register(FunctionDef {
                    min_args: 0,
                    max_args: None,
                    ..def.clone()
                });
            }
        }

        let run = |formula: &str| {
            let ast = parse_formula(formula).unwrap();
            Evaluator::new(&EmptyContext, &loose).evaluate(&ast)
        };

        // Every built-in survives being called with no arguments
        for name in builtins.names() {
            run(&format!("={}()", name));
        }

        for formula in [
            "=IF()",
            "=IF(TRUE)",
            "=IFERROR(1/0)",
            "=CHOOSE()",
            "=NOT()",
            "=ABS()",
            "=MOD(1)",
            "=POWER(2)",
            "=COUNTBLANK()",
            "=MID(\"abc\",1)",
            "=MID(\"abc\")",
            "=LEN()",
            "=ISERROR()",
            "=ISBLANK()",
        ] {
            assert_eq!(run(formula).error_kind(), Some(CellError::Value), "{}", formula);
        }

        // Arguments that are present still work
        assert_eq!(run("=IF(FALSE)"), Value::Boolean(false));
        assert_eq!(run("=IFERROR(5)"), Value::Number(5.0));
    }
}
