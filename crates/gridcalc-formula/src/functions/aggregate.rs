//! Aggregate functions: SUM, AVERAGE, MAX, MIN
//!
//! Each one flattens nested collections into a single sequence before
//! reducing, and yields `Null` when that sequence is empty. The first error
//! value in the sequence is returned as the result.

use crate::value::Value;
use std::cmp::Ordering;

/// Flatten arguments, descending into collections at any depth
pub fn flatten(args: &[Value]) -> Vec<&Value> {
    let mut flat = Vec::with_capacity(args.len());
    flatten_into(args, &mut flat);
    flat
}

fn flatten_into<'a>(values: &'a [Value], flat: &mut Vec<&'a Value>) {
    for value in values {
        match value {
            Value::Collection(items) => flatten_into(items, flat),
            other => flat.push(other),
        }
    }
}

fn first_error<'a>(values: &[&'a Value]) -> Option<&'a Value> {
    values.iter().copied().find(|value| value.is_error())
}

/// SUM function
///
/// Concatenates the textual form of every element when any element is a
/// string; otherwise adds the elements numerically.
pub fn fn_sum(args: &[Value]) -> Value {
    let values = flatten(args);
    if values.is_empty() {
        return Value::Null;
    }
    if let Some(err) = first_error(&values) {
        return err.clone();
    }

    if values.iter().any(|value| matches!(value, Value::String(_))) {
        return Value::String(values.iter().map(|value| value.to_text()).collect());
    }

    Value::Number(values.iter().map(|value| value.to_number()).sum())
}

/// AVERAGE function
///
/// Every element counts, including nulls from empty range cells. Text that is
/// not a number makes the result NaN.
pub fn fn_average(args: &[Value]) -> Value {
    let values = flatten(args);
    if values.is_empty() {
        return Value::Null;
    }
    if let Some(err) = first_error(&values) {
        return err.clone();
    }

    let sum: f64 = values.iter().map(|value| value.to_number()).sum();
    Value::Number(sum / values.len() as f64)
}

/// MAX function
pub fn fn_max(args: &[Value]) -> Value {
    extreme(args, Ordering::Greater)
}

/// MIN function
pub fn fn_min(args: &[Value]) -> Value {
    extreme(args, Ordering::Less)
}

/// Left-to-right reduction keeping the element that compares `wanted`
/// against the current best
fn extreme(args: &[Value], wanted: Ordering) -> Value {
    let values = flatten(args);
    if let Some(err) = first_error(&values) {
        return err.clone();
    }

    let mut iter = values.into_iter();
    let mut best = match iter.next() {
        Some(first) => first,
        None => return Value::Null,
    };
    for value in iter {
        if natural_cmp(value, best) == Some(wanted) {
            best = value;
        }
    }
    best.clone()
}

/// Natural ordering between two values
///
/// Two strings compare alphabetically; any other pair compares by numeric
/// coercion. Pairs involving NaN are unordered.
pub fn natural_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}
