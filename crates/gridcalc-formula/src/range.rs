//! Range expansion
//!
//! A range names two corner cells. Expansion walks the rectangle column by
//! column (outer loop) and row by row within each column (inner loop),
//! producing the ids of every cell it covers.

use crate::ast::RangeReference;
use crate::error::{EvalError, EvalResult};
use lazy_regex::regex_captures;
use std::cmp::Ordering;

/// Split a well-formed id like `AB_12` into `("AB", 12)`
///
/// Returns `None` unless the id is uppercase letters, an underscore and a row
/// number without leading zeros that fits in a `u64`.
pub fn split_reference_id(id: &str) -> Option<(&str, u64)> {
    let (_, column, row) = regex_captures!(r"^([A-Z]+)_([1-9][0-9]*)$", id)?;
    let row = row.parse().ok()?;
    Some((column, row))
}

/// Column after `column`: `A` → `B`, `Z` → `AA`, `AZ` → `BA`, `ZZ` → `AAA`
///
/// Expects uppercase ASCII letters.
pub fn next_column(column: &str) -> String {
    let mut letters: Vec<u8> = column.bytes().collect();
    let mut carry = true;
    for letter in letters.iter_mut().rev() {
        if *letter < b'Z' {
            *letter += 1;
            carry = false;
            break;
        }
        *letter = b'A';
    }
    if carry {
        letters.insert(0, b'A');
    }
    letters.into_iter().map(char::from).collect()
}

/// Spreadsheet column order: shorter labels first, then alphabetical
///
/// Agrees with plain lexicographic order whenever both labels have the same
/// width, and keeps `Z` before `AA`.
pub fn column_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Ids covered by a range, columns outermost
///
/// The corners may be given in any order; `A_5:A_1` covers the same cells as
/// `A_1:A_5`.
pub fn expand_range(range: &RangeReference) -> EvalResult<Vec<String>> {
    let (start_column, start_row) = split_endpoint(&range.start.id)?;
    let (end_column, end_row) = split_endpoint(&range.end.id)?;

    let (min_column, max_column) = match column_order(start_column, end_column) {
        Ordering::Greater => (end_column, start_column),
        _ => (start_column, end_column),
    };
    let (min_row, max_row) = (start_row.min(end_row), start_row.max(end_row));

    let mut ids = Vec::new();
    let mut column = min_column.to_string();
    loop {
        for row in min_row..=max_row {
            ids.push(format!("{}_{}", column, row));
        }
        if column == max_column {
            break;
        }
        column = next_column(&column);
    }

    tracing::debug!(
        start = %range.start.id,
        end = %range.end.id,
        cells = ids.len(),
        "expanded range"
    );
    Ok(ids)
}

fn split_endpoint(id: &str) -> EvalResult<(&str, u64)> {
    split_reference_id(id).ok_or_else(|| EvalError::InvalidReference(id.to_string()))
}
