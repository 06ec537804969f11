//! Formula error types
//!
//! Errors come in two tiers. Structural faults found while tokenizing or
//! parsing abort the whole `parse` call ([`ParseError`]). Evaluation faults are
//! mostly carried as [`Value::Error`](crate::Value::Error) through the normal
//! result channel; only a malformed range endpoint and an unknown function name
//! abort evaluation ([`EvalError`]).

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Result type for tokenizing and parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type for evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Structural failures raised while tokenizing or parsing a formula
///
/// Positions are zero-based character offsets into the formula text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The character at `position` matches no token class
    #[error("Invalid token at position {position}")]
    InvalidToken { position: usize },

    /// A string literal opened at `position` is never closed
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// An opening parenthesis at `position` has no matching ')'
    #[error("Unclosed parenthesis opened at position {position}")]
    UnclosedParenthesis { position: usize },

    /// The token at `position` cannot start or continue an expression
    #[error("Invalid expression at position {position}: unexpected {found}")]
    InvalidExpression { position: usize, found: String },

    /// A ':' argument separator at `position` joins something other than two bare references
    #[error("Invalid range at position {position}: both sides of ':' must be references")]
    InvalidRange { position: usize },

    /// Function name not immediately followed by '('
    #[error("Missing '(' after function {name} at position {position}")]
    MissingOpenParen { position: usize, name: String },
}

/// Evaluation failures that abort evaluation instead of producing an error value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Range endpoint is not of the form `<LETTERS>_<ROW>`
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Function name missing from the registry
    #[error("Invalid function name: {0}")]
    InvalidFunctionName(String),
}

/// Errors that can occur during formula parsing, evaluation or configuration
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// Lexer option pattern failed to compile
    #[error("Invalid lexer option: {0}")]
    InvalidOption(#[from] regex::Error),
}
