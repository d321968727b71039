//! Correlative pivot.
//!
//! D3 returns logically related repeating attributes as parallel multivalued
//! fields: `[[a1, a2], [b1, b2]]`. Pivoting recombines them by position into
//! rows: `[(a1, b1), (a2, b2)]`.
//!
//! # Example
//!
//! ```
//! use d3_connector::codec::Value;
//! use d3_connector::structure::pivot_rows;
//!
//! let columns = vec![Value::from(vec!["a", "b"]), Value::from(vec!["x", "y"])];
//! let rows = pivot_rows(&columns, 0, None).unwrap();
//! assert_eq!(rows, vec![
//!     vec![Value::from("a"), Value::from("x")],
//!     vec![Value::from("b"), Value::from("y")],
//! ]);
//! ```

use crate::codec::Value;

/// Result of [`pivot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pivot {
    /// First row only.
    Row(Vec<Value>),
    /// Every row.
    Rows(Vec<Vec<Value>>),
}

/// Pivot the column window `columns[start..start + length]` into rows.
///
/// Returns `None` if the window is empty, its first column is `Null`, or
/// (for a single row) there are no rows.
pub fn pivot(
    columns: &[Value],
    start: usize,
    length: Option<usize>,
    multiple: bool,
) -> Option<Pivot> {
    if multiple {
        pivot_rows(columns, start, length).map(Pivot::Rows)
    } else {
        pivot_row(columns, start, length).map(Pivot::Row)
    }
}

/// Pivot the window and return the first row.
pub fn pivot_row(columns: &[Value], start: usize, length: Option<usize>) -> Option<Vec<Value>> {
    pivot_rows(columns, start, length)?.into_iter().next()
}

/// Pivot the window and return every row.
///
/// Scalar columns count as one-element columns; shorter columns are padded
/// with `Null` up to the longest one.
pub fn pivot_rows(
    columns: &[Value],
    start: usize,
    length: Option<usize>,
) -> Option<Vec<Vec<Value>>> {
    let window = select(columns, start, length);
    if window.first().map_or(true, Value::is_null) {
        return None;
    }

    let normalized: Vec<&[Value]> = window
        .iter()
        .map(|column| match column {
            Value::List(items) => items.as_slice(),
            scalar => std::slice::from_ref(scalar),
        })
        .collect();

    let height = normalized.iter().map(|c| c.len()).max().unwrap_or(0);
    let rows = (0..height)
        .map(|i| {
            normalized
                .iter()
                .map(|column| column.get(i).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Some(rows)
}

fn select(columns: &[Value], start: usize, length: Option<usize>) -> &[Value] {
    let start = start.min(columns.len());
    let end = match length {
        Some(len) => start.saturating_add(len).min(columns.len()),
        None => columns.len(),
    };
    &columns[start..end]
}
