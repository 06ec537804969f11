//! Formula lexer
//!
//! A pull-based scanner: [`TokenStream::next_token`] produces one token at a
//! time from a character cursor, so the parser never needs the whole token
//! list up front.

use crate::error::{ParseError, ParseResult};
use crate::options::LexerOptions;
use std::fmt;

/// Token kinds, carrying their content
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal
    Number(f64),
    /// Double-quoted text literal (quotes removed, `""` unescaped)
    String(String),
    /// Cell reference id such as `A_1`
    Reference(String),
    /// Built-in function name
    Function(String),
    /// Single-character operator
    Operator(char),
    /// Single-character delimiter
    Delimiter(char),
    /// End of input
    End,
}

/// A token and the character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    /// True if this is the given operator character
    pub fn is_operator(&self, op: char) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    /// True if this is the given delimiter character
    pub fn is_delimiter(&self, delimiter: char) -> bool {
        self.kind == TokenKind::Delimiter(delimiter)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string \"{}\"", s.replace('"', "\"\"")),
            TokenKind::Reference(id) => write!(f, "reference {}", id),
            TokenKind::Function(name) => write!(f, "function {}", name),
            TokenKind::Operator(c) => write!(f, "operator '{}'", c),
            TokenKind::Delimiter(c) => write!(f, "delimiter '{}'", c),
            TokenKind::End => write!(f, "end of input"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.position)
    }
}

/// Lazily tokenizes one formula
pub struct TokenStream<'a> {
    chars: Vec<char>,
    pos: usize,
    options: &'a LexerOptions,
    finished: bool,
}

impl TokenStream<'static> {
    /// Tokenize with the default operator, delimiter and function sets
    pub fn new(input: &str) -> Self {
        TokenStream::with_options(input, LexerOptions::shared())
    }
}

impl<'a> TokenStream<'a> {
    pub fn with_options(input: &str, options: &'a LexerOptions) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            options,
            finished: false,
        }
    }

    /// Scan the next token
    ///
    /// Returns an [`TokenKind::End`] token once the input is exhausted, and
    /// keeps returning it on further calls.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::End, self.pos)),
        };

        if c.is_whitespace() {
            self.skip_whitespace();
            return self.next_token();
        }

        let start = self.pos;
        let kind = if c.is_ascii_digit() {
            self.scan_number()?
        } else if c.is_ascii_alphabetic() {
            self.scan_word()
        } else if c == '"' {
            self.scan_string()?
        } else if self.options.is_operator(c) {
            self.advance();
            TokenKind::Operator(c)
        } else if self.options.is_delimiter(c) {
            self.advance();
            TokenKind::Delimiter(c)
        } else {
            return Err(ParseError::InvalidToken { position: start });
        };

        tracing::trace!(position = start, token = %kind, "scanned token");
        Ok(Token::new(kind, start))
    }

    // === Scanners ===

    /// Numbers grow one character at a time for as long as the text read so
    /// far is still a finite number. An exponent marker is only taken when a
    /// digit (optionally after a sign) follows it and that digit keeps the
    /// number finite; otherwise the number ends in front of the `e`.
    fn scan_number(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        let mut text = String::new();
        let mut has_exponent = false;

        while let Some(c) = self.peek_char() {
            if c == 'e' || c == 'E' {
                let marker_len = self.exponent_marker_len();
                if has_exponent || marker_len == 0 {
                    break;
                }
                // The marker plus its first digit must still be finite
                let mut candidate = text.clone();
                candidate.extend((0..=marker_len).filter_map(|i| self.peek_char_at(i)));
                if !candidate.parse::<f64>().map_or(false, f64::is_finite) {
                    break;
                }
                for _ in 0..marker_len {
                    if let Some(m) = self.peek_char() {
                        text.push(m);
                    }
                    self.advance();
                }
                has_exponent = true;
                continue;
            }

            text.push(c);
            if text.parse::<f64>().map_or(false, f64::is_finite) {
                self.advance();
            } else {
                text.pop();
                break;
            }
        }

        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ParseError::InvalidToken { position: start })
    }

    /// Characters making up an exponent marker at the cursor: `e` followed by
    /// a digit is 1, `e` followed by a sign and a digit is 2, anything else 0.
    fn exponent_marker_len(&self) -> usize {
        match (self.peek_char_at(1), self.peek_char_at(2)) {
            (Some(d), _) if d.is_ascii_digit() => 1,
            (Some('+' | '-'), Some(d)) if d.is_ascii_digit() => 2,
            _ => 0,
        }
    }

    fn scan_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek_char() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            word.push(c);
            self.advance();
        }

        if self.options.is_function_name(&word) {
            TokenKind::Function(word)
        } else {
            TokenKind::Reference(word)
        }
    }

    fn scan_string(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString { position: start }),
                Some('"') => {
                    self.advance();
                    // "" inside a literal is an escaped quote
                    if self.peek_char() == Some('"') {
                        s.push('"');
                        self.advance();
                    } else {
                        return Ok(TokenKind::String(s));
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = ParseResult<Token>;

    /// Yields every token up to and including `End`, or up to the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        self.finished = match &result {
            Ok(token) => token.is_end(),
            Err(_) => true,
        };
        Some(result)
    }
}

/// Tokenize a whole formula with the default options
///
/// # Example
/// ```rust
/// use gridcalc_formula::{tokenize, TokenKind};
///
/// let tokens = tokenize("SUM(A_1:B_2)").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Function("SUM".into()));
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
/// ```
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    TokenStream::new(input).collect()
}
