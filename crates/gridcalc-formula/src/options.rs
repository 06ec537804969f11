//! Lexer options
//!
//! The operator and delimiter character classes are patterns rather than fixed
//! sets so that a host can run a different formula dialect through the same
//! lexer. Each candidate character is tested on its own against the pattern.

use crate::error::FormulaResult;
use crate::functions::BUILTIN_FUNCTIONS;
use lazy_regex::regex;
use regex::Regex;
use std::sync::OnceLock;

/// Default operator class: `+ - * / ^`
pub const DEFAULT_OPERATORS: &str = r"^[+\-*/^]$";

/// Default delimiter class: `( ) , :`
pub const DEFAULT_DELIMITERS: &str = r"^[(),:]$";

static DEFAULT_OPTIONS: OnceLock<LexerOptions> = OnceLock::new();

/// Options controlling how formula text is split into tokens
#[derive(Debug, Clone)]
pub struct LexerOptions {
    /// Pattern a single character must match to be an operator token
    pub operators: Regex,
    /// Pattern a single character must match to be a delimiter token
    pub delimiters: Regex,
    /// Words lexed as function names instead of references (exact match)
    pub function_names: Vec<String>,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            operators: Regex::clone(regex!(r"^[+\-*/^]$")),
            delimiters: Regex::clone(regex!(r"^[(),:]$")),
            function_names: BUILTIN_FUNCTIONS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl LexerOptions {
    /// Build options from custom operator and delimiter patterns
    ///
    /// # Example
    /// ```rust
    /// use gridcalc_formula::LexerOptions;
    ///
    /// // Allow ';' as an extra delimiter
    /// let options = LexerOptions::new(r"^[+\-*/^]$", r"^[(),:;]$").unwrap();
    /// assert!(options.is_delimiter(';'));
    /// ```
    pub fn new(operators: &str, delimiters: &str) -> FormulaResult<Self> {
        Ok(Self {
            operators: Regex::new(operators)?,
            delimiters: Regex::new(delimiters)?,
            ..Self::default()
        })
    }

    /// Replace the set of recognized function names
    pub fn with_function_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.function_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Shared default options, compiled once
    pub fn shared() -> &'static LexerOptions {
        DEFAULT_OPTIONS.get_or_init(LexerOptions::default)
    }

    pub fn is_operator(&self, c: char) -> bool {
        self.operators.is_match(c.encode_utf8(&mut [0; 4]))
    }

    pub fn is_delimiter(&self, c: char) -> bool {
        self.delimiters.is_match(c.encode_utf8(&mut [0; 4]))
    }

    pub fn is_function_name(&self, word: &str) -> bool {
        self.function_names.iter().any(|name| name == word)
    }
}
