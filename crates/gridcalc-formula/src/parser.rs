//! Formula parser
//!
//! A recursive descent parser with one token of lookahead.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! Expr    := Term (('+' | '-') Term)*
//! Term    := Power (('*' | '/') Power)*
//! Power   := Unary ('^' Unary)*
//! Unary   := '-' Atom | Atom
//! Atom    := '(' Expr ')' | FNNAME '(' ArgList? ')' | NUMBER | STRING | REFERENCE
//! ArgList := Expr (ArgSep Expr)*
//! ArgSep  := ',' | ':'
//! ```
//!
//! Each level folds its operators left to right in a loop, `^` included, so
//! `2^3^2` is `(2^3)^2`.

use crate::ast::{BinaryOperator, CellReference, Expr, RangeReference, UnaryOperator};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Token, TokenKind, TokenStream};
use crate::options::LexerOptions;

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use gridcalc_formula::parse;
///
/// let ast = parse("1 + 2").unwrap();
/// let ast = parse("1 + SUM(A_1:B_6)").unwrap();
/// assert!(parse("(1 + 2").is_err());
/// ```
pub fn parse(formula: &str) -> ParseResult<Expr> {
    Parser::new(formula).parse()
}

/// Parse with custom lexer options
pub fn parse_with_options(formula: &str, options: &LexerOptions) -> ParseResult<Expr> {
    Parser::with_options(formula, options).parse()
}

/// Formula parser
///
/// A parser reads a single formula; [`Parser::parse`] consumes it.
pub struct Parser<'a> {
    tokens: TokenStream<'a>,
    current: Token,
}

impl Parser<'static> {
    pub fn new(formula: &str) -> Self {
        Parser::from_stream(TokenStream::new(formula))
    }
}

impl<'a> Parser<'a> {
    pub fn with_options(formula: &str, options: &'a LexerOptions) -> Self {
        Parser::from_stream(TokenStream::with_options(formula, options))
    }

    fn from_stream(tokens: TokenStream<'a>) -> Self {
        Self {
            tokens,
            // Replaced by the first real token when parsing starts
            current: Token::new(TokenKind::End, 0),
        }
    }

    /// Parse the whole formula
    ///
    /// Anything left over after a complete expression is an error.
    pub fn parse(mut self) -> ParseResult<Expr> {
        self.consume()?;
        let expr = self.parse_expression()?;

        if !self.current.is_end() {
            return Err(self.invalid_expression());
        }

        tracing::debug!(formula = %expr, "parsed formula");
        Ok(expr)
    }

    // === Helper methods ===

    /// Move to the next token, returning the one just passed
    fn consume(&mut self) -> ParseResult<Token> {
        let next = self.tokens.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Binary operator at the cursor, if it is one of `accepted`
    fn binary_operator(&self, accepted: &[BinaryOperator]) -> Option<BinaryOperator> {
        match self.current.kind {
            TokenKind::Operator(c) => {
                BinaryOperator::from_symbol(c).filter(|op| accepted.contains(op))
            }
            _ => None,
        }
    }

    fn invalid_expression(&self) -> ParseError {
        ParseError::InvalidExpression {
            position: self.current.position,
            found: self.current.kind.to_string(),
        }
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;

        while let Some(op) =
            self.binary_operator(&[BinaryOperator::Add, BinaryOperator::Subtract])
        {
            self.consume()?;
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_power()?;

        while let Some(op) =
            self.binary_operator(&[BinaryOperator::Multiply, BinaryOperator::Divide])
        {
            self.consume()?;
            let right = self.parse_power()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.binary_operator(&[BinaryOperator::Power]) {
            self.consume()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        // Only a single '-' directly in front of an atom
        if self.current.is_operator('-') {
            self.consume()?;
            let operand = self.parse_atom()?;
            return Ok(Expr::unary(UnaryOperator::Negate, operand));
        }

        self.parse_atom()
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.consume()?;
                Ok(Expr::Number(n))
            }

            TokenKind::String(s) => {
                self.consume()?;
                Ok(Expr::String(s))
            }

            TokenKind::Reference(id) => {
                self.consume()?;
                Ok(Expr::Reference(CellReference { id }))
            }

            TokenKind::Delimiter('(') => {
                let open = self.consume()?;
                let expr = self.parse_expression()?;
                if !self.current.is_delimiter(')') {
                    return Err(ParseError::UnclosedParenthesis {
                        position: open.position,
                    });
                }
                self.consume()?;
                Ok(expr)
            }

            TokenKind::Function(name) => {
                self.consume()?;
                if !self.current.is_delimiter('(') {
                    return Err(ParseError::MissingOpenParen {
                        position: self.current.position,
                        name,
                    });
                }
                let open = self.consume()?;
                let args = self.parse_arguments(open.position)?;
                Ok(Expr::Function { name, args })
            }

            _ => Err(self.invalid_expression()),
        }
    }

    /// Arguments up to and including the closing ')'
    ///
    /// A ':' separator merges the previous argument and the next one into a
    /// range; both must be bare references.
    fn parse_arguments(&mut self, open: usize) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        if self.current.is_delimiter(')') {
            self.consume()?;
            return Ok(args);
        }

        args.push(self.parse_expression()?);

        loop {
            match self.current.kind {
                TokenKind::Delimiter(',') => {
                    self.consume()?;
                    args.push(self.parse_expression()?);
                }
                TokenKind::Delimiter(':') => {
                    let separator = self.consume()?;
                    let end = self.parse_expression()?;
                    match (args.pop(), end) {
                        (Some(Expr::Reference(start)), Expr::Reference(end)) => {
                            args.push(Expr::RangeRef(RangeReference { start, end }));
                        }
                        _ => {
                            return Err(ParseError::InvalidRange {
                                position: separator.position,
                            })
                        }
                    }
                }
                TokenKind::Delimiter(')') => {
                    self.consume()?;
                    return Ok(args);
                }
                _ => return Err(ParseError::UnclosedParenthesis { position: open }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse("42").unwrap(), num(42.0));
        assert_eq!(parse("3.14").unwrap(), num(3.14));
        assert_eq!(parse("1e10").unwrap(), num(1e10));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse("\"Hello\"").unwrap(), Expr::String("Hello".into()));
        assert_eq!(
            parse("\"Hello \"\"World\"\"\"").unwrap(),
            Expr::String("Hello \"World\"".into())
        );
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse("A_1").unwrap(), Expr::reference("A_1"));
        // Plain references are not validated
        assert_eq!(parse("total_2x").unwrap(), Expr::reference("total_2x"));
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        assert_eq!(
            parse("1+2*3").unwrap(),
            Expr::binary(
                BinaryOperator::Add,
                num(1.0),
                Expr::binary(BinaryOperator::Multiply, num(2.0), num(3.0))
            )
        );
    }

    #[test]
    fn test_parse_left_associative() {
        assert_eq!(
            parse("1 - 2 - 3").unwrap(),
            Expr::binary(
                BinaryOperator::Subtract,
                Expr::binary(BinaryOperator::Subtract, num(1.0), num(2.0)),
                num(3.0)
            )
        );
        assert_eq!(
            parse("2 ^ 3 ^ 2").unwrap(),
            Expr::binary(
                BinaryOperator::Power,
                Expr::binary(BinaryOperator::Power, num(2.0), num(3.0)),
                num(2.0)
            )
        );
    }

    #[test]
    fn test_parse_unary() {
        assert_eq!(
            parse("-5").unwrap(),
            Expr::unary(UnaryOperator::Negate, num(5.0))
        );
        assert_eq!(
            parse("-2^2").unwrap(),
            Expr::binary(
                BinaryOperator::Power,
                Expr::unary(UnaryOperator::Negate, num(2.0)),
                num(2.0)
            )
        );
    }

    #[test]
    fn test_double_negation_is_invalid() {
        assert_eq!(
            parse("--5"),
            Err(ParseError::InvalidExpression {
                position: 1,
                found: "operator '-'".into()
            })
        );
    }

    #[test]
    fn test_parse_parentheses() {
        assert_eq!(
            parse("(1+2)*3").unwrap(),
            Expr::binary(
                BinaryOperator::Multiply,
                Expr::binary(BinaryOperator::Add, num(1.0), num(2.0)),
                num(3.0)
            )
        );
    }

    #[test]
    fn test_parse_function() {
        assert_eq!(
            parse("1 + SUM(A_1:B_6)").unwrap(),
            Expr::binary(
                BinaryOperator::Add,
                num(1.0),
                Expr::function("SUM", vec![Expr::range("A_1", "B_6")])
            )
        );

        assert_eq!(
            parse("MAX(1, A_2, B_1:B_3, -4)").unwrap(),
            Expr::function(
                "MAX",
                vec![
                    num(1.0),
                    Expr::reference("A_2"),
                    Expr::range("B_1", "B_3"),
                    Expr::unary(UnaryOperator::Negate, num(4.0)),
                ]
            )
        );
    }

    #[test]
    fn test_parse_empty_and_nested_functions() {
        assert_eq!(parse("SUM()").unwrap(), Expr::function("SUM", vec![]));
        assert_eq!(
            parse("SUM(MIN(1, 2), AVERAGE(3))").unwrap(),
            Expr::function(
                "SUM",
                vec![
                    Expr::function("MIN", vec![num(1.0), num(2.0)]),
                    Expr::function("AVERAGE", vec![num(3.0)]),
                ]
            )
        );
    }

    #[test]
    fn test_range_endpoints_must_be_references() {
        assert_eq!(
            parse("SUM(1:B_2)"),
            Err(ParseError::InvalidRange { position: 5 })
        );
        assert_eq!(
            parse("SUM(A_1:B_2+1)"),
            Err(ParseError::InvalidRange { position: 7 })
        );
        // A range cannot be extended by another ':'
        assert_eq!(
            parse("SUM(A_1:B_2:C_3)"),
            Err(ParseError::InvalidRange { position: 11 })
        );
    }

    #[test]
    fn test_range_outside_function_is_invalid() {
        assert_eq!(
            parse("A_1:B_2"),
            Err(ParseError::InvalidExpression {
                position: 3,
                found: "delimiter ':'".into()
            })
        );
    }

    #[test]
    fn test_unclosed_parenthesis() {
        assert_eq!(
            parse("(1 + 2"),
            Err(ParseError::UnclosedParenthesis { position: 0 })
        );
        assert_eq!(
            parse("2 * SUM(1, 2"),
            Err(ParseError::UnclosedParenthesis { position: 7 })
        );
        assert_eq!(
            parse("(1 2)"),
            Err(ParseError::UnclosedParenthesis { position: 0 })
        );
    }

    #[test]
    fn test_invalid_expression() {
        assert_eq!(
            parse(")"),
            Err(ParseError::InvalidExpression {
                position: 0,
                found: "delimiter ')'".into()
            })
        );
        assert_eq!(
            parse(""),
            Err(ParseError::InvalidExpression {
                position: 0,
                found: "end of input".into()
            })
        );
        assert_eq!(
            parse("1 +"),
            Err(ParseError::InvalidExpression {
                position: 3,
                found: "end of input".into()
            })
        );
        assert!(matches!(
            parse("1 2"),
            Err(ParseError::InvalidExpression { position: 2, .. })
        ));
    }

    #[test]
    fn test_missing_open_paren() {
        assert_eq!(
            parse("SUM + 1"),
            Err(ParseError::MissingOpenParen {
                position: 4,
                name: "SUM".into()
            })
        );
        assert_eq!(
            parse("AVERAGE"),
            Err(ParseError::MissingOpenParen {
                position: 7,
                name: "AVERAGE".into()
            })
        );
    }

    #[test]
    fn test_lexer_errors_surface() {
        assert_eq!(parse("1 # 2"), Err(ParseError::InvalidToken { position: 2 }));
    }

    #[test]
    fn test_custom_dialect() {
        // ';' is lexed as a delimiter but the grammar has no place for it
        let options = LexerOptions::new(r"^[+\-*/^]$", r"^[(),:;]$").unwrap();
        assert!(matches!(
            parse_with_options("SUM(1;2)", &options),
            Err(ParseError::UnclosedParenthesis { position: 3 })
        ));

        let options = LexerOptions::default().with_function_names(["TOTAL"]);
        assert_eq!(
            parse_with_options("TOTAL(SUM)", &options).unwrap(),
            Expr::function("TOTAL", vec![Expr::reference("SUM")])
        );
    }

    #[test]
    fn test_display_round_trip() {
        for formula in [
            "1 + SUM(A_1:B_6)",
            "2 ^ 3 ^ 2",
            "-(1 - 2) * \"a\"\"b\" / C_3",
            "MAX(MIN(1, 2), AVERAGE())",
        ] {
            let ast = parse(formula).unwrap();
            assert_eq!(parse(&ast.to_string()).unwrap(), ast, "{}", formula);
        }
    }
}
