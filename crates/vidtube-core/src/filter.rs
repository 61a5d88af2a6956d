//! Match predicates and single-document update descriptions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::path::{field_matches, get_path, remove_path, set_path, values_equal};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// A predicate over documents, used by `find*`, `delete_many`, `update_one`
/// and pipeline match stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  /// Matches every document.
  All,
  /// Field equals value; array fields match when any element does.
  Eq(String, Value),
  /// Field equals one of the values.
  In(String, Vec<Value>),
  /// Field is present (and non-null) or absent.
  Exists(String, bool),
  /// Case-insensitive search: any whitespace-separated term of `term`
  /// occurs in any of `fields`.
  Text { fields: Vec<String>, term: String },
  And(Vec<Filter>),
  Or(Vec<Filter>),
}

impl Filter {
  pub fn eq(field: impl Into<String>, value: Value) -> Self {
    Self::Eq(field.into(), value)
  }

  /// Field holds the given id.
  pub fn eq_id(field: impl Into<String>, id: Uuid) -> Self {
    Self::Eq(field.into(), json!(id))
  }

  /// Matches the document whose `_id` is `id`.
  pub fn id(id: Uuid) -> Self { Self::eq_id("_id", id) }

  pub fn exists(field: impl Into<String>) -> Self {
    Self::Exists(field.into(), true)
  }

  pub fn text(fields: &[&str], term: impl Into<String>) -> Self {
    Self::Text {
      fields: fields.iter().map(|f| (*f).to_owned()).collect(),
      term:   term.into(),
    }
  }

  /// Conjunction, flattening nested `And`s and dropping `All`.
  pub fn and(self, other: Filter) -> Self {
    match (self, other) {
      (Self::All, f) | (f, Self::All) => f,
      (Self::And(mut a), Self::And(b)) => {
        a.extend(b);
        Self::And(a)
      }
      (Self::And(mut a), f) => {
        a.push(f);
        Self::And(a)
      }
      (f, Self::And(mut b)) => {
        b.insert(0, f);
        Self::And(b)
      }
      (a, b) => Self::And(vec![a, b]),
    }
  }

  pub fn matches(&self, doc: &Value) -> bool {
    match self {
      Self::All => true,
      Self::Eq(field, target) => match get_path(doc, field) {
        Some(v) => field_matches(&v, target),
        None => target.is_null(),
      },
      Self::In(field, targets) => get_path(doc, field)
        .is_some_and(|v| targets.iter().any(|t| field_matches(&v, t))),
      Self::Exists(field, wanted) => {
        let present = !matches!(get_path(doc, field), None | Some(Value::Null));
        present == *wanted
      }
      Self::Text { fields, term } => {
        let terms: Vec<String> =
          term.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
          return true;
        }
        fields.iter().any(|field| {
          let Some(Value::String(s)) = get_path(doc, field) else {
            return false;
          };
          let haystack = s.to_lowercase();
          terms.iter().any(|t| haystack.contains(t.as_str()))
        })
      }
      Self::And(filters) => filters.iter().all(|f| f.matches(doc)),
      Self::Or(filters) => filters.iter().any(|f| f.matches(doc)),
    }
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// A set of field modifications applied atomically to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
  set:        Vec<(String, Value)>,
  unset:      Vec<String>,
  inc:        Vec<(String, i64)>,
  add_to_set: Vec<(String, Value)>,
  pull:       Vec<(String, Value)>,
}

impl Update {
  pub fn new() -> Self { Self::default() }

  pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
    self.set.push((field.into(), value));
    self
  }

  pub fn unset(mut self, field: impl Into<String>) -> Self {
    self.unset.push(field.into());
    self
  }

  pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
    self.inc.push((field.into(), by));
    self
  }

  /// Append `value` to the array at `field` unless already present.
  pub fn add_to_set(mut self, field: impl Into<String>, value: Value) -> Self {
    self.add_to_set.push((field.into(), value));
    self
  }

  /// Remove every element equal to `value` from the array at `field`.
  pub fn pull(mut self, field: impl Into<String>, value: Value) -> Self {
    self.pull.push((field.into(), value));
    self
  }

  /// Apply to `doc` and stamp `updatedAt`.
  pub fn apply(&self, doc: &mut Value, now: DateTime<Utc>) {
    for (field, value) in &self.set {
      set_path(doc, field, value.clone());
    }
    for field in &self.unset {
      remove_path(doc, field);
    }
    for (field, by) in &self.inc {
      let current = get_path(doc, field).and_then(|v| v.as_i64()).unwrap_or(0);
      set_path(doc, field, json!(current.saturating_add(*by)));
    }
    for (field, value) in &self.add_to_set {
      let mut items = match get_path(doc, field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
      };
      if !items.iter().any(|item| values_equal(item, value)) {
        items.push(value.clone());
      }
      set_path(doc, field, Value::Array(items));
    }
    for (field, value) in &self.pull {
      if let Some(Value::Array(mut items)) = get_path(doc, field) {
        items.retain(|item| !values_equal(item, value));
        set_path(doc, field, Value::Array(items));
      }
    }
    set_path(doc, "updatedAt", json!(timestamp(now)));
  }
}

/// The canonical stored form of a timestamp: UTC with microseconds, so
/// every stored value has the same width.
pub fn timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
