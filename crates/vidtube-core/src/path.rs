//! Dotted field paths over JSON documents.
//!
//! Resolution follows document-store conventions: a path that crosses an
//! array maps over its elements, so `likes.likedBy` on a document with a
//! `likes` array yields the array of every `likedBy` value.

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// Resolve `path` against `doc`. Returns `None` when a segment is missing.
pub fn get_path(doc: &Value, path: &str) -> Option<Value> {
  let segments: Vec<&str> = path.split('.').collect();
  resolve(doc, &segments)
}

fn resolve(value: &Value, segments: &[&str]) -> Option<Value> {
  let Some((head, rest)) = segments.split_first() else {
    return Some(value.clone());
  };
  match value {
    Value::Object(map) => map.get(*head).and_then(|v| resolve(v, rest)),
    Value::Array(items) => Some(Value::Array(
      items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| resolve(item, segments))
        .collect(),
    )),
    _ => None,
  }
}

/// Set `path` on `doc`, creating intermediate objects as needed.
/// Does nothing when `doc` (or an intermediate value) is not an object.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
  let mut current = doc;
  let mut segments = path.split('.').peekable();
  while let Some(segment) = segments.next() {
    let Value::Object(map) = current else { return };
    if segments.peek().is_none() {
      map.insert(segment.to_owned(), value);
      return;
    }
    current = map
      .entry(segment.to_owned())
      .or_insert_with(|| Value::Object(Map::new()));
  }
}

/// Remove `path` from `doc`, returning the removed value.
pub fn remove_path(doc: &mut Value, path: &str) -> Option<Value> {
  match path.rsplit_once('.') {
    None => doc.as_object_mut()?.remove(path),
    Some((parent, leaf)) => {
      let mut current = doc;
      for segment in parent.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
      }
      current.as_object_mut()?.remove(leaf)
    }
  }
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

/// Whether a stored field value satisfies an equality match against
/// `target`. Array fields match when any element does.
pub fn field_matches(field: &Value, target: &Value) -> bool {
  match field {
    Value::Array(items) if !target.is_array() => {
      items.iter().any(|item| values_equal(item, target))
    }
    _ => values_equal(field, target),
  }
}

fn type_rank(v: Option<&Value>) -> u8 {
  match v {
    None | Some(Value::Null) => 0,
    Some(Value::Number(_)) => 1,
    Some(Value::String(_)) => 2,
    Some(Value::Object(_)) => 3,
    Some(Value::Array(_)) => 4,
    Some(Value::Bool(_)) => 5,
  }
}

/// Total order used by sort stages. Missing values sort first. Strings
/// compare bytewise; stored timestamps are fixed-width UTC (see
/// [`crate::filter::timestamp`]), so that is also chronological.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    _ => type_rank(a).cmp(&type_rank(b)),
  }
}
