//! Formula values
//!
//! Values are a closed set of variants; every coercion below matches on all
//! of them so adding a variant forces each site to decide how to treat it.

use crate::ast::Expr;
use crate::context::Context;
use crate::error::EvalResult;
use lazy_regex::regex_is_match;
use std::fmt;
use std::sync::Arc;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    /// Evaluation fault carried as a value; propagates through operators
    Error(String),
    /// Ordered, possibly nested sequence (range results)
    Collection(Vec<Value>),
    /// Unevaluated expression bound to its own context
    Formula(LazyFormula),
}

/// An expression evaluated against its bound context on every access
///
/// Results are not cached. Nothing guards against a formula whose context
/// leads back to itself; evaluating such a cycle recurses until the stack is
/// exhausted.
#[derive(Clone)]
pub struct LazyFormula {
    pub expr: Arc<Expr>,
    pub context: Arc<dyn Context + Send + Sync>,
}

impl LazyFormula {
    pub fn new(expr: Expr, context: Arc<dyn Context + Send + Sync>) -> Self {
        Self {
            expr: Arc::new(expr),
            context,
        }
    }

    /// Evaluate with the built-in function registry
    pub fn evaluate(&self) -> EvalResult<Value> {
        crate::evaluator::evaluate(&self.expr, self.context.as_ref())
    }
}

impl fmt::Debug for LazyFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFormula")
            .field("expr", &self.expr)
            .finish_non_exhaustive()
    }
}

/// Two formulas are equal when they hold equal trees over the same context
impl PartialEq for LazyFormula {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr && Arc::ptr_eq(&self.context, &other.context)
    }
}

impl Value {
    /// Wrap an expression and its context into a lazily evaluated value
    pub fn formula(expr: Expr, context: Arc<dyn Context + Send + Sync>) -> Self {
        Value::Formula(LazyFormula::new(expr, context))
    }

    /// Error value for an operand of the wrong kind
    pub fn type_error(message: impl fmt::Display) -> Self {
        Value::Error(format!("TypeError: {}", message))
    }

    /// Numeric coercion for arithmetic
    ///
    /// Text is parsed with [`parse_number`] after trimming (blank text is 0,
    /// anything else that is not a number is NaN), booleans are 1/0 and null is 0. Errors, collections and
    /// unevaluated formulas have no numeric form and give NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    parse_number(s).unwrap_or(f64::NAN)
                }
            }
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::Null => 0.0,
            Value::Error(_) | Value::Collection(_) | Value::Formula(_) => f64::NAN,
        }
    }

    /// Textual form used by concatenation
    pub fn to_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Null => String::new(),
            Value::Error(message) => message.clone(),
            Value::Collection(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Formula(formula) => format!("={}", formula.expr),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Collection(_))
    }

    /// Variant name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Error(_) => "error",
            Value::Collection(_) => "collection",
            Value::Formula(_) => "formula",
        }
    }
}

/// Read numeric text: decimal literals with an optional sign, fraction and
/// exponent, or `Infinity` / `-Infinity` as printed by [`format_number`]
///
/// Other spellings Rust's float parser accepts (`inf`, `nan`, ...) are not
/// numbers here.
///
/// # Example
/// ```rust
/// use gridcalc_formula::value::parse_number;
///
/// assert_eq!(parse_number("-1.5e3"), Some(-1500.0));
/// assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
/// assert_eq!(parse_number("inf"), None);
/// ```
pub fn parse_number(text: &str) -> Option<f64> {
    if regex_is_match!(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$", text)
        || regex_is_match!(r"^[+-]?Infinity$", text)
    {
        text.parse().ok()
    } else {
        None
    }
}

/// Format a number the way formulas print it: integral values without a
/// fraction, `NaN`, and `Infinity`/`-Infinity`
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Collection(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Value::Null => write!(f, "null"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Collection(items)
    }
}
