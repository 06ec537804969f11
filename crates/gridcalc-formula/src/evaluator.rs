//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`Context`] to produce values.

use crate::ast::{BinaryOperator, Expr, RangeReference, UnaryOperator};
use crate::context::Context;
use crate::error::{EvalError, EvalResult};
use crate::functions::FunctionRegistry;
use crate::range::expand_range;
use crate::value::Value;
use std::sync::OnceLock;

/// Built-in function registry (lazily initialized, never mutated)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Registry used by [`evaluate`]
pub fn default_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Evaluate a formula expression with the built-in functions
///
/// # Example
/// ```rust
/// use gridcalc_formula::{evaluate, parse, CellMap, Value};
///
/// let mut cells = CellMap::new();
/// cells.insert("A_1".into(), Value::Number(2.0));
///
/// let ast = parse("1 + SUM(A_1:A_3)").unwrap();
/// assert_eq!(evaluate(&ast, &cells).unwrap(), Value::Number(3.0));
/// ```
pub fn evaluate<C: Context + ?Sized>(expr: &Expr, ctx: &C) -> EvalResult<Value> {
    Evaluator::new(default_registry()).evaluate(expr, ctx)
}

/// Evaluates expressions using a given function registry
#[derive(Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r FunctionRegistry {
        self.registry
    }

    /// Evaluate an expression
    ///
    /// Operand faults come back as `Ok(Value::Error(..))`. Only a malformed
    /// range endpoint or an unknown function name returns `Err`.
    pub fn evaluate<C: Context + ?Sized>(&self, expr: &Expr, ctx: &C) -> EvalResult<Value> {
        match expr {
            // === Literals ===
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),

            // === References ===
            // A missing cell is NaN here, but Null inside a range
            Expr::Reference(cell) => match ctx.lookup(&cell.id) {
                Some(value) => self.resolve(value),
                None => Ok(Value::Number(f64::NAN)),
            },

            Expr::RangeRef(range) => self.evaluate_range(range, ctx),

            // === Operators ===
            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand, ctx)?;
                Ok(apply_unary(*op, value))
            }

            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, ctx)?;
                let right = self.evaluate(right, ctx)?;
                Ok(apply_binary(*op, left, right))
            }

            // === Functions ===
            Expr::Function { name, args } => self.evaluate_function(name, args, ctx),
        }
    }

    /// Read through a stored value, evaluating lazy formulas
    ///
    /// Formulas are evaluated against their own bound context each time; a
    /// collection is resolved element by element.
    pub fn resolve(&self, value: &Value) -> EvalResult<Value> {
        match value {
            Value::Formula(formula) => self.evaluate(&formula.expr, formula.context.as_ref()),
            Value::Collection(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Collection),
            other => Ok(other.clone()),
        }
    }

    fn evaluate_range<C: Context + ?Sized>(
        &self,
        range: &RangeReference,
        ctx: &C,
    ) -> EvalResult<Value> {
        let mut values = Vec::new();
        for id in expand_range(range)? {
            let value = match ctx.lookup(&id) {
                Some(value) => self.resolve(value)?,
                None => Value::Null,
            };
            values.push(value);
        }
        Ok(Value::Collection(values))
    }

    fn evaluate_function<C: Context + ?Sized>(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &C,
    ) -> EvalResult<Value> {
        // Arguments are evaluated before the name is checked
        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.evaluate(arg, ctx)?);
        }

        let func = self
            .registry
            .get(name)
            .ok_or_else(|| EvalError::InvalidFunctionName(name.to_string()))?;

        tracing::debug!(function = name, args = evaluated_args.len(), "calling function");
        Ok((func.implementation)(&evaluated_args))
    }
}

/// Apply a unary operator to an evaluated operand
pub fn apply_unary(op: UnaryOperator, value: Value) -> Value {
    match value {
        Value::Error(_) => value,
        Value::Number(n) => match op {
            UnaryOperator::Identity => Value::Number(n),
            UnaryOperator::Negate => Value::Number(-n),
        },
        other => Value::type_error(format!(
            "unary '{}' expects a number, got {}",
            op,
            other.type_name()
        )),
    }
}

/// Apply a binary operator to evaluated operands
///
/// The left operand's error wins over the right's. Collections are rejected;
/// `+` concatenates when either side is a string.
pub fn apply_binary(op: BinaryOperator, left: Value, right: Value) -> Value {
    if left.is_error() {
        return left;
    }
    if right.is_error() {
        return right;
    }
    if left.is_collection() || right.is_collection() {
        return Value::type_error(format!(
            "operator '{}' expects scalar operands, got {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ));
    }

    match op {
        BinaryOperator::Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(left.to_text() + &right.to_text())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Power => Value::Number(left.to_number().powf(right.to_number())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CellMap;
    use crate::functions::FunctionDef;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn eval(formula: &str) -> EvalResult<Value> {
        let ast = parse(formula).unwrap();
        evaluate(&ast, &CellMap::new())
    }

    fn eval_with(formula: &str, cells: &CellMap) -> EvalResult<Value> {
        let ast = parse(formula).unwrap();
        evaluate(&ast, cells)
    }

    fn cells(entries: &[(&str, Value)]) -> CellMap {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect()
    }

    fn assert_nan(value: Value) {
        match value {
            Value::Number(n) => assert!(n.is_nan(), "Expected NaN, got {}", n),
            other => panic!("Expected Number, got {:?}", other),
        }
    }

    fn assert_type_error(value: Value) {
        match value {
            Value::Error(message) => assert!(message.starts_with("TypeError"), "{}", message),
            other => panic!("Expected TypeError, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1 + 2 - 3").unwrap(), Value::Number(0.0));
        assert_eq!(eval("4*5").unwrap(), Value::Number(20.0));
        assert_eq!(eval("20/4").unwrap(), Value::Number(5.0));
        assert_eq!(eval("2^10").unwrap(), Value::Number(1024.0));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval("2+3*4-5").unwrap(), Value::Number(9.0));
        assert_eq!(eval("2*3^2").unwrap(), Value::Number(18.0));
    }

    #[test]
    fn test_power_is_left_associative() {
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), Value::Number(64.0));
        assert_eq!(eval("2 ^ (3 ^ 2)").unwrap(), Value::Number(512.0));
    }

    #[test]
    fn test_power_fractional_and_negative() {
        assert_eq!(eval("4 ^ 0.5").unwrap(), Value::Number(2.0));
        assert_eq!(eval("2 ^ -1").unwrap(), Value::Number(0.5));
        assert_nan(eval("-8 ^ 0.5").unwrap());
    }

    #[test]
    fn test_ieee_semantics() {
        assert_eq!(eval("1/0").unwrap(), Value::Number(f64::INFINITY));
        assert_eq!(eval("-1/0").unwrap(), Value::Number(f64::NEG_INFINITY));
        assert_nan(eval("0/0").unwrap());
        assert_eq!(eval("0.1 + 0.2").unwrap(), Value::Number(0.1 + 0.2));
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        assert_eq!(eval("-2 ^ 2").unwrap(), Value::Number(4.0));
        assert_eq!(eval("-(1 + 2)").unwrap(), Value::Number(-3.0));
    }

    #[test]
    fn test_unary_on_string_is_type_error() {
        assert_type_error(eval("-\"abc\"").unwrap());
        assert_type_error(eval("-\"5\"").unwrap());
    }

    #[test]
    fn test_unary_identity() {
        let expr = Expr::unary(UnaryOperator::Identity, Expr::Number(3.0));
        assert_eq!(evaluate(&expr, &CellMap::new()).unwrap(), Value::Number(3.0));

        let expr = Expr::unary(UnaryOperator::Identity, Expr::String("x".into()));
        assert_type_error(evaluate(&expr, &CellMap::new()).unwrap());
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("\"a\" + \"b\"").unwrap(), Value::from("ab"));
        assert_eq!(eval("\"2\" + 3").unwrap(), Value::from("23"));
        assert_eq!(eval("1 + \"x\"").unwrap(), Value::from("1x"));
    }

    #[test]
    fn test_numeric_coercion_of_strings() {
        assert_eq!(eval("\"6\" * 2").unwrap(), Value::Number(12.0));
        assert_eq!(eval("\"6\" - \"1\"").unwrap(), Value::Number(5.0));
        assert_nan(eval("\"abc\" * 2").unwrap());
    }

    #[test]
    fn test_missing_reference_is_nan() {
        assert_nan(eval("A_1").unwrap());
        assert_nan(eval("A_1 + 1").unwrap());
        assert_nan(eval("whatever").unwrap());
    }

    #[test]
    fn test_reference_lookup() {
        let cells = cells(&[("A_1", Value::Number(2.0)), ("B_1", Value::from("x"))]);
        assert_eq!(eval_with("A_1 * 10", &cells).unwrap(), Value::Number(20.0));
        assert_eq!(eval_with("B_1 + A_1", &cells).unwrap(), Value::from("x2"));
    }

    #[test]
    fn test_missing_range_cells_are_null() {
        let cells = cells(&[("A_1", Value::Number(1.0)), ("B_2", Value::Number(4.0))]);
        let ast = Expr::range("A_1", "B_2");
        assert_eq!(
            evaluate(&ast, &cells).unwrap(),
            Value::Collection(vec![
                Value::Number(1.0),
                Value::Null,
                Value::Null,
                Value::Number(4.0),
            ])
        );
    }

    #[test]
    fn test_sum_over_range() {
        let cells = cells(&[
            ("A_1", Value::Number(2.0)),
            ("A_2", Value::Number(3.0)),
            ("B_4", Value::Number(5.0)),
            ("B_6", Value::Number(10.0)),
        ]);
        assert_eq!(
            eval_with("1 + SUM(A_1:B_6)", &cells).unwrap(),
            Value::Number(21.0)
        );
        assert_eq!(
            eval_with("1 + SUM(B_6:A_1)", &cells).unwrap(),
            Value::Number(21.0)
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("SUM(1,2,3)").unwrap(), Value::Number(6.0));
        assert_eq!(eval("AVERAGE(2,4,6)").unwrap(), Value::Number(4.0));
        assert_eq!(eval("MIN(5,2,8,1)").unwrap(), Value::Number(1.0));
        assert_eq!(eval("MAX(5,2,8,1)").unwrap(), Value::Number(8.0));
        assert_eq!(eval("SUM(\"2\",\"3\")").unwrap(), Value::from("23"));
        assert_eq!(eval("SUM(1,MAX(10,20),3)").unwrap(), Value::Number(24.0));
    }

    #[test]
    fn test_empty_functions_are_null() {
        for formula in ["SUM()", "AVERAGE()", "MAX()", "MIN()"] {
            assert_eq!(eval(formula).unwrap(), Value::Null, "{}", formula);
        }
    }

    #[test]
    fn test_collection_operand_is_type_error() {
        let sum_of_range = Expr::binary(
            BinaryOperator::Add,
            Expr::Number(1.0),
            Expr::range("A_1", "A_2"),
        );
        assert_type_error(evaluate(&sum_of_range, &CellMap::new()).unwrap());

        let cells = cells(&[("A_1", Value::Collection(vec![Value::Number(1.0)]))]);
        assert_type_error(eval_with("A_1 * 2", &cells).unwrap());
    }

    #[test]
    fn test_error_propagation_prefers_left() {
        assert_eq!(
            apply_binary(
                BinaryOperator::Add,
                Value::Error("left".into()),
                Value::Error("right".into())
            ),
            Value::Error("left".into())
        );
        assert_eq!(
            apply_binary(BinaryOperator::Multiply, Value::Number(1.0), Value::Error("right".into())),
            Value::Error("right".into())
        );
        // An error wins over a collection operand
        assert_eq!(
            apply_binary(
                BinaryOperator::Add,
                Value::Collection(vec![]),
                Value::Error("right".into())
            ),
            Value::Error("right".into())
        );
    }

    #[test]
    fn test_error_values_flow_upward() {
        let cells = cells(&[("A_1", Value::Error("#REF".into()))]);
        assert_eq!(
            eval_with("1 + -A_1 * 2", &cells).unwrap(),
            Value::Error("#REF".into())
        );
        assert_eq!(
            eval_with("SUM(A_1, 2)", &cells).unwrap(),
            Value::Error("#REF".into())
        );
    }

    #[test]
    fn test_invalid_range_endpoint_is_hard_error() {
        assert_eq!(
            eval("SUM(a_1:B_2)"),
            Err(EvalError::InvalidReference("a_1".into()))
        );
        assert_eq!(
            eval("SUM(A_1:B_0)"),
            Err(EvalError::InvalidReference("B_0".into()))
        );
    }

    #[test]
    fn test_unknown_function_is_hard_error() {
        let ast = Expr::function("COUNT", vec![Expr::Number(1.0)]);
        assert_eq!(
            evaluate(&ast, &CellMap::new()),
            Err(EvalError::InvalidFunctionName("COUNT".into()))
        );
    }

    #[test]
    fn test_arguments_evaluated_before_name_check() {
        let ast = Expr::function("NOPE", vec![Expr::range("x", "A_1")]);
        assert_eq!(
            evaluate(&ast, &CellMap::new()),
            Err(EvalError::InvalidReference("x".into()))
        );
    }

    #[test]
    fn test_substituted_registry() {
        fn count(args: &[Value]) -> Value {
            Value::Number(crate::functions::aggregate::flatten(args).len() as f64)
        }

        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionDef {
            name: "SUM",
            implementation: count,
        });
        let evaluator = Evaluator::new(&registry);

        let ast = parse("SUM(A_1:C_2, 7)").unwrap();
        assert_eq!(
            evaluator.evaluate(&ast, &CellMap::new()).unwrap(),
            Value::Number(7.0)
        );

        let ast = parse("MAX(1)").unwrap();
        assert_eq!(
            evaluator.evaluate(&ast, &CellMap::new()),
            Err(EvalError::InvalidFunctionName("MAX".into()))
        );
    }

    #[test]
    fn test_lazy_formula_reads_bound_context() {
        let inner: Arc<dyn Context + Send + Sync> =
            Arc::new(cells(&[("A_1", Value::Number(4.0)), ("A_2", Value::Number(6.0))]));
        let formula = Value::formula(parse("SUM(A_1:A_2) / 2").unwrap(), inner);

        let outer = cells(&[("C_1", formula.clone()), ("A_1", Value::Number(100.0))]);
        assert_eq!(eval_with("C_1 + 1", &outer).unwrap(), Value::Number(6.0));
        assert_eq!(
            eval_with("SUM(C_1:C_2)", &outer).unwrap(),
            Value::Number(5.0)
        );
        if let Value::Formula(lazy) = formula {
            assert_eq!(lazy.evaluate().unwrap(), Value::Number(5.0));
        }
    }

    #[test]
    fn test_lazy_formula_is_not_memoized() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Answers alternately from two values on successive lookups
        struct Alternating {
            reads: AtomicUsize,
            values: [Value; 2],
        }

        impl Context for Alternating {
            fn lookup(&self, _id: &str) -> Option<&Value> {
                let n = self.reads.fetch_add(1, Ordering::SeqCst);
                Some(&self.values[n % 2])
            }
        }

        let source = Alternating {
            reads: AtomicUsize::new(0),
            values: [Value::Number(1.0), Value::Number(2.0)],
        };
        let formula = Value::formula(parse("A_1 * 10").unwrap(), Arc::new(source));
        let outer = cells(&[("B_1", formula)]);

        assert_eq!(eval_with("B_1", &outer).unwrap(), Value::Number(10.0));
        assert_eq!(eval_with("B_1", &outer).unwrap(), Value::Number(20.0));
    }
}
