//! # gridcalc-formula
//!
//! Formula tokenizer, parser and evaluator for gridcalc.
//!
//! This crate provides:
//! - Tokenizing (text → tokens) with configurable operator and delimiter classes
//! - Formula parsing (tokens → AST)
//! - Formula evaluation (AST → value) against any cell [`Context`]
//! - Range expansion over `<COLUMN>_<ROW>` cell ids
//! - Built-in aggregate functions: `SUM`, `AVERAGE`, `MAX`, `MIN`
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_formula::{evaluate, parse, CellMap, Value};
//!
//! let mut cells = CellMap::new();
//! cells.insert("A_1".to_string(), Value::Number(1.0));
//! cells.insert("A_2".to_string(), Value::Number(2.0));
//! cells.insert("B_1".to_string(), Value::Number(3.0));
//!
//! let ast = parse("1 + SUM(A_1:B_2)").unwrap();
//! let result = evaluate(&ast, &cells).unwrap();
//! assert_eq!(result, Value::Number(7.0));
//! ```
//!
//! Tokens can be inspected on their own:
//!
//! ```rust
//! use gridcalc_formula::{tokenize, TokenKind};
//!
//! let tokens = tokenize("SUM(A_1)").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Function("SUM".to_string()));
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod range;
pub mod value;

pub use ast::{BinaryOperator, CellReference, Expr, RangeReference, UnaryOperator};
pub use context::{CellMap, Context};
pub use error::{EvalError, EvalResult, FormulaError, FormulaResult, ParseError, ParseResult};
pub use evaluator::{default_registry, evaluate, Evaluator};
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry, BUILTIN_FUNCTIONS};
pub use lexer::{tokenize, Token, TokenKind, TokenStream};
pub use options::LexerOptions;
pub use parser::{parse, parse_with_options, Parser};
pub use range::{column_order, expand_range, next_column, split_reference_id};
pub use value::{LazyFormula, Value};
