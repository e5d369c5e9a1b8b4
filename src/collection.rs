//! Collection conveniences built on chunked traversal.
//!
//! Everything here pages through the query with the configured chunk size,
//! except the sorts, which need every row to produce a total order.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use serde_json::Value as JsonValue;

use fluentql_core::{Direction, Operator, Row, key_of};

use crate::error::{FluentError, Result};
use crate::query::Query;

/// Reads a dotted path out of nested objects. Arrays along the path resolve
/// through their first element.
///
/// ```ignore
/// data_get(&order, "items.product.name") // first item's product name
/// ```
pub fn data_get<'v>(value: &'v JsonValue, path: &str) -> Option<&'v JsonValue> {
    let mut current = value;
    for segment in path.split('.') {
        while let JsonValue::Array(items) = current {
            current = items.first()?;
        }
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn row_get<'r>(row: &'r Row, path: &str) -> Option<&'r JsonValue> {
    match path.split_once('.') {
        None => row.get(path),
        Some((head, rest)) => data_get(row.get(head)?, rest),
    }
}

/// Orders JSON values the way a loose comparison would: nulls first, then
/// numbers (including numeric strings) by value, then text.
pub fn loose_cmp(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn number(value: &JsonValue) -> Option<f64> {
        match value {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            JsonValue::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        _ => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (a, b) {
                (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        },
    }
}

fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (key_of(a), key_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// An in-memory comparison for [`Query::contains_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=` or `==`
    Loose(Operator),
    /// `===`
    Identical,
    /// `!==`
    NotIdentical,
}

impl Comparison {
    /// Accepts the SQL comparison operators plus `==`, `===` and `!==`.
    /// LIKE forms are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim() {
            "==" => Ok(Comparison::Loose(Operator::Eq)),
            "===" => Ok(Comparison::Identical),
            "!==" => Ok(Comparison::NotIdentical),
            other => match Operator::parse(other)? {
                Operator::Like | Operator::NotLike => {
                    Err(FluentError::InvalidOperator(input.to_owned()))
                }
                op => Ok(Comparison::Loose(op)),
            },
        }
    }

    pub fn matches(&self, found: &JsonValue, value: &JsonValue) -> bool {
        match self {
            Comparison::Identical => found == value,
            Comparison::NotIdentical => found != value,
            Comparison::Loose(Operator::Eq) => loose_eq(found, value),
            Comparison::Loose(Operator::NotEq | Operator::Ne) => !loose_eq(found, value),
            Comparison::Loose(op) => {
                let ordering = loose_cmp(found, value);
                match op {
                    Operator::Lt => ordering == Ordering::Less,
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Le => ordering != Ordering::Greater,
                    Operator::Ge => ordering != Ordering::Less,
                    _ => false,
                }
            }
        }
    }
}

impl<'db> Query<'db> {
    fn default_chunk(&self) -> u64 {
        self.db.config().default_chunk_size
    }

    /// Values of `column` (dotted paths allowed) for every row.
    pub fn pluck(self, column: &str) -> Result<Vec<JsonValue>> {
        let size = self.default_chunk();
        let mut values = Vec::new();
        self.chunk(size, |page| {
            values.extend(
                page.iter()
                    .map(|row| row_get(row, column).cloned().unwrap_or(JsonValue::Null)),
            );
            ControlFlow::Continue(())
        })?;
        Ok(values)
    }

    /// `key_column -> value_column` for every row with a usable key. Later
    /// rows win on duplicate keys.
    pub fn pluck_keyed(self, value_column: &str, key_column: &str) -> Result<Row> {
        let size = self.default_chunk();
        let mut values = Row::new();
        self.chunk(size, |page| {
            for row in &page {
                if let Some(key) = row_get(row, key_column).and_then(key_of) {
                    let value = row_get(row, value_column).cloned().unwrap_or(JsonValue::Null);
                    values.insert(key.to_string(), value);
                }
            }
            ControlFlow::Continue(())
        })?;
        Ok(values)
    }

    /// Rows for which `predicate` holds.
    pub fn filter<F>(self, mut predicate: F) -> Result<Vec<Row>>
    where
        F: FnMut(&Row) -> bool,
    {
        let size = self.default_chunk();
        let mut kept = Vec::new();
        self.chunk(size, |page| {
            kept.extend(page.into_iter().filter(|row| predicate(row)));
            ControlFlow::Continue(())
        })?;
        Ok(kept)
    }

    /// Whether any row's `column` loosely equals `value`. Stops at the
    /// first page with a match.
    pub fn contains(self, column: &str, value: &JsonValue) -> Result<bool> {
        self.contains_by(column, "=", value)
    }

    /// Whether any row's `column` compares to `value` under `op`. A missing
    /// column reads as null. The operator is checked before any query runs.
    ///
    /// ```ignore
    /// db.table("orders")?.contains_by("total", ">=", &json!(20))?
    /// ```
    pub fn contains_by(self, column: &str, op: &str, value: &JsonValue) -> Result<bool> {
        let comparison = Comparison::parse(op)?;
        self.contains_where(|row| {
            let found = row_get(row, column).unwrap_or(&JsonValue::Null);
            comparison.matches(found, value)
        })
    }

    pub fn contains_where<F>(self, mut predicate: F) -> Result<bool>
    where
        F: FnMut(&Row) -> bool,
    {
        let size = self.default_chunk();
        let mut found = false;
        self.chunk(size, |page| {
            found = page.iter().any(&mut predicate);
            if found { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        })?;
        Ok(found)
    }

    /// Every row, sorted by `column`.
    pub fn sort_by(self, column: &str, direction: Direction) -> Result<Vec<Row>> {
        self.sort_by_multiple(&[(column, direction)])
    }

    /// Every row, sorted by each `(column, direction)` in turn.
    pub fn sort_by_multiple(self, keys: &[(&str, Direction)]) -> Result<Vec<Row>> {
        let mut rows = self.get()?;
        rows.sort_by(|a, b| {
            for (column, direction) in keys {
                let left = row_get(a, column).unwrap_or(&JsonValue::Null);
                let right = row_get(b, column).unwrap_or(&JsonValue::Null);
                let ordering = match direction {
                    Direction::Asc => loose_cmp(left, right),
                    Direction::Desc => loose_cmp(right, left),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(rows)
    }
}
