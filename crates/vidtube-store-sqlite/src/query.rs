//! Translation of [`Filter`]s into SQL conditions over `documents`.
//!
//! A condition may admit rows the filter rejects but never drops a row the
//! filter accepts, so [`crate::table::scan`] re-checks every row in Rust.
//! Parts without a SQL form are left to that re-check.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use vidtube_core::{Collection, filter::Filter};

/// Above this many keys an `IN` list is not bound; the scan falls back to
/// the Rust re-check.
const MAX_BOUND_KEYS: usize = 5_000;

/// A SQL boolean expression with positional (`?`) parameters.
#[derive(Debug, PartialEq)]
pub struct Condition {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

/// The SQL narrowing `filter` on `collection`, if any part of it has one.
pub fn condition(collection: Collection, filter: &Filter) -> Option<Condition> {
  match filter {
    Filter::Eq(field, target) => membership(collection, field, std::slice::from_ref(target)),
    Filter::In(_, targets) if targets.is_empty() => {
      Some(Condition { sql: "0".into(), params: Vec::new() })
    }
    Filter::In(field, targets) if targets.len() <= MAX_BOUND_KEYS => {
      membership(collection, field, targets)
    }
    Filter::And(filters) => {
      let parts: Vec<Condition> =
        filters.iter().filter_map(|f| condition(collection, f)).collect();
      join(parts, " AND ")
    }
    Filter::Or(filters) => {
      let parts: Option<Vec<Condition>> =
        filters.iter().map(|f| condition(collection, f)).collect();
      join(parts?, " OR ")
    }
    _ => None,
  }
}

fn join(parts: Vec<Condition>, op: &str) -> Option<Condition> {
  if parts.is_empty() {
    return None;
  }
  let sql = parts
    .iter()
    .map(|c| format!("({})", c.sql))
    .collect::<Vec<_>>()
    .join(op);
  let params = parts.into_iter().flat_map(|c| c.params).collect();
  Some(Condition { sql, params })
}

/// `field` equals one of `targets`. Array fields also admit every document
/// holding an array there; the re-check tests the elements.
fn membership(collection: Collection, field: &str, targets: &[Value]) -> Option<Condition> {
  let params = targets.iter().map(scalar).collect::<Option<Vec<_>>>()?;
  let placeholders = vec!["?"; params.len()].join(", ");

  if field == "_id" {
    if !params.iter().all(|p| matches!(p, SqlValue::Text(_))) {
      return None;
    }
    return Some(Condition { sql: format!("doc_id IN ({placeholders})"), params });
  }

  if !is_plain_field(field) {
    return None;
  }
  let path = format!("'$.{field}'");
  let mut sql = format!("json_extract(body, {path}) IN ({placeholders})");
  if collection.array_fields().contains(&field) {
    sql = format!("{sql} OR json_type(body, {path}) = 'array'");
  }
  Some(Condition { sql, params })
}

/// A top-level field name that can be spliced into a JSON path literal.
fn is_plain_field(field: &str) -> bool {
  field.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The SQL value `json_extract` yields for a scalar JSON value. Null and
/// composite targets have no SQL equality.
fn scalar(value: &Value) -> Option<SqlValue> {
  match value {
    Value::String(s) => Some(SqlValue::Text(s.clone())),
    Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
    Value::Number(n) => n
      .as_i64()
      .map(SqlValue::Integer)
      .or_else(|| n.as_f64().map(SqlValue::Real)),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}
