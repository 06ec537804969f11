//! Formula Abstract Syntax Tree types

use crate::value::format_number;
use std::fmt;

/// Formula expression AST
///
/// Every node owns its children; trees are built once by the parser and never
/// mutated by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),

    // === References ===
    /// Single cell reference
    Reference(CellReference),
    /// Rectangular range between two references
    RangeRef(RangeReference),

    // === Operators ===
    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // === Function call ===
    Function { name: String, args: Vec<Expr> },
}

/// Reference to a single cell by id (e.g. `A_1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellReference {
    pub id: String,
}

impl CellReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Range between two cell references, in the order written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeReference {
    pub start: CellReference,
    pub end: CellReference,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperator {
    /// Operator for a symbol character, if it is one
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOperator::Add),
            '-' => Some(BinaryOperator::Subtract),
            '*' => Some(BinaryOperator::Multiply),
            '/' => Some(BinaryOperator::Divide),
            '^' => Some(BinaryOperator::Power),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
            BinaryOperator::Power => '^',
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Unsigned term; yields its operand unchanged
    Identity,
    Negate,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Identity => write!(f, "+"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

impl Expr {
    pub fn reference(id: impl Into<String>) -> Self {
        Expr::Reference(CellReference::new(id))
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Expr::RangeRef(RangeReference {
            start: CellReference::new(start),
            end: CellReference::new(end),
        })
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// Every reference id named in the tree, in source order
    ///
    /// Ranges contribute their two endpoints, not the cells between them.
    pub fn references(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_references(&mut ids);
        ids
    }

    fn collect_references<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) | Expr::String(_) => {}
            Expr::Reference(cell) => ids.push(&cell.id),
            Expr::RangeRef(range) => {
                ids.push(&range.start.id);
                ids.push(&range.end.id);
            }
            Expr::Unary { operand, .. } => operand.collect_references(ids),
            Expr::Binary { left, right, .. } => {
                left.collect_references(ids);
                right.collect_references(ids);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(ids);
                }
            }
        }
    }
}

/// Renders formula text; a tree built by the parser reads back unchanged
///
/// Binary nodes are always parenthesised so precedence and associativity
/// survive the round trip.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", format_number(*n)),
            Expr::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Expr::Reference(cell) => write!(f, "{}", cell.id),
            Expr::RangeRef(range) => write!(f, "{}:{}", range.start.id, range.end.id),
            Expr::Unary {
                op: UnaryOperator::Identity,
                operand,
            } => write!(f, "{}", operand),
            Expr::Unary {
                op: UnaryOperator::Negate,
                operand,
            } => write!(f, "-{}", operand),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
