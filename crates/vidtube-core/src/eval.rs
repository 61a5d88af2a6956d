//! In-process execution of [`Pipeline`]s over JSON documents.
//!
//! Backends load the base documents themselves (typically narrowed by
//! [`Pipeline::leading_filter`]) and hand them to [`run`]. Lookups ask the
//! [`CollectionSource`] only for documents whose join field matches a key
//! present in the input.

use std::{
  collections::{HashMap, HashSet},
  convert::Infallible,
};

use serde_json::{Map, Value, json};

use crate::{
  Collection,
  path::{compare_values, field_matches, get_path, remove_path, set_path, values_equal},
  pipeline::{Accumulator, Expr, Lookup, Pipeline, SortDirection, SortKey, Stage},
};

/// Supplies the documents of joined collections.
pub trait CollectionSource {
  type Error;

  /// Every document of `collection` whose `field` matches one of `keys`, in
  /// natural order. May return extra documents; callers re-check.
  fn matching(
    &self,
    collection: Collection,
    field: &str,
    keys: &[Value],
  ) -> Result<Vec<Value>, Self::Error>;
}

impl CollectionSource for HashMap<Collection, Vec<Value>> {
  type Error = Infallible;

  fn matching(
    &self,
    collection: Collection,
    field: &str,
    keys: &[Value],
  ) -> Result<Vec<Value>, Infallible> {
    Ok(
      self
        .get(&collection)
        .map(|docs| {
          docs
            .iter()
            .filter(|d| matches_any(d, field, keys))
            .cloned()
            .collect()
        })
        .unwrap_or_default(),
    )
  }
}

/// Execute `pipeline` over `input`, resolving lookups through `source`.
pub fn run<S: CollectionSource + ?Sized>(
  pipeline: &Pipeline,
  input: Vec<Value>,
  source: &S,
) -> Result<Vec<Value>, S::Error> {
  pipeline
    .stages()
    .iter()
    .try_fold(input, |docs, stage| apply_stage(stage, docs, source))
}

fn apply_stage<S: CollectionSource + ?Sized>(
  stage: &Stage,
  mut docs: Vec<Value>,
  source: &S,
) -> Result<Vec<Value>, S::Error> {
  let out = match stage {
    Stage::Match(filter) => {
      docs.retain(|d| filter.matches(d));
      docs
    }
    Stage::Lookup(lookup) => {
      join(lookup, &mut docs, source)?;
      docs
    }
    Stage::Unwind { path, preserve_empty } => unwind(docs, path, *preserve_empty),
    Stage::AddFields(fields) => {
      for doc in &mut docs {
        let computed: Vec<(&String, Option<Value>)> = fields
          .iter()
          .map(|(name, expr)| (name, eval(expr, name, doc)))
          .collect();
        for (name, value) in computed {
          match value {
            Some(v) => set_path(doc, name, v),
            None => {
              remove_path(doc, name);
            }
          }
        }
      }
      docs
    }
    Stage::Project(fields) => docs.iter().map(|d| project(fields, d)).collect(),
    Stage::Sort(keys) => {
      docs.sort_by(|a, b| compare_by(keys, a, b));
      docs
    }
    Stage::Skip(n) => docs.into_iter().skip(*n as usize).collect(),
    Stage::Limit(n) => docs.into_iter().take(*n as usize).collect(),
    Stage::ReplaceRoot(path) => docs
      .iter()
      .filter_map(|d| get_path(d, path).filter(Value::is_object))
      .collect(),
    Stage::Group(accumulators) => {
      if docs.is_empty() {
        return Ok(docs);
      }
      let mut out = Map::new();
      for (name, acc) in accumulators {
        let value = match acc {
          Accumulator::Count => json!(docs.len()),
          Accumulator::Sum(expr) => {
            let values: Vec<Value> =
              docs.iter().filter_map(|d| eval(expr, name, d)).collect();
            sum_numbers(values.iter())
          }
        };
        out.insert(name.clone(), value);
      }
      vec![Value::Object(out)]
    }
    Stage::Count(field) => {
      if docs.is_empty() {
        return Ok(docs);
      }
      vec![json!({ field.as_str(): docs.len() })]
    }
  };
  Ok(out)
}

/// Non-null join keys held at `path`, which may be a scalar or an array.
fn join_keys(doc: &Value, path: &str) -> Vec<Value> {
  let keys = match get_path(doc, path) {
    Some(Value::Array(items)) => items,
    Some(v) => vec![v],
    None => Vec::new(),
  };
  keys.into_iter().filter(|k| !k.is_null()).collect()
}

fn matches_any(doc: &Value, field: &str, keys: &[Value]) -> bool {
  get_path(doc, field).is_some_and(|fv| keys.iter().any(|k| field_matches(&fv, k)))
}

/// Resolve `lookup` for every document with one fetch from `source`.
fn join<S: CollectionSource + ?Sized>(
  lookup: &Lookup,
  docs: &mut [Value],
  source: &S,
) -> Result<(), S::Error> {
  let per_doc: Vec<Vec<Value>> =
    docs.iter().map(|d| join_keys(d, &lookup.local_field)).collect();

  let mut seen = HashSet::new();
  let wanted: Vec<Value> = per_doc
    .iter()
    .flatten()
    .filter(|k| seen.insert(k.to_string()))
    .cloned()
    .collect();
  let foreign = if wanted.is_empty() {
    Vec::new()
  } else {
    source.matching(lookup.from, &lookup.foreign_field, &wanted)?
  };

  for (doc, keys) in docs.iter_mut().zip(&per_doc) {
    let joined = if keys.is_empty() {
      Vec::new()
    } else {
      let matched: Vec<Value> = foreign
        .iter()
        .filter(|f| matches_any(f, &lookup.foreign_field, keys))
        .cloned()
        .collect();
      run(&lookup.pipeline, matched, source)?
    };
    set_path(doc, &lookup.as_field, Value::Array(joined));
  }
  Ok(())
}

fn unwind(docs: Vec<Value>, path: &str, preserve_empty: bool) -> Vec<Value> {
  let mut out = Vec::with_capacity(docs.len());
  for mut doc in docs {
    match get_path(&doc, path) {
      Some(Value::Array(items)) if !items.is_empty() => {
        for item in items {
          let mut copy = doc.clone();
          set_path(&mut copy, path, item);
          out.push(copy);
        }
      }
      Some(Value::Array(_)) | Some(Value::Null) | None => {
        if preserve_empty {
          remove_path(&mut doc, path);
          out.push(doc);
        }
      }
      Some(_) => out.push(doc),
    }
  }
  out
}

fn project(fields: &[(String, Expr)], doc: &Value) -> Value {
  let mut out = Value::Object(Map::new());
  if !fields.iter().any(|(name, _)| name == "_id")
    && let Some(id) = doc.get("_id")
  {
    set_path(&mut out, "_id", id.clone());
  }
  for (name, expr) in fields {
    if let Some(v) = eval(expr, name, doc) {
      set_path(&mut out, name, v);
    }
  }
  out
}

/// Evaluate `expr` for the output field `name` against `doc`. `None` means
/// the field is absent from the result.
fn eval(expr: &Expr, name: &str, doc: &Value) -> Option<Value> {
  match expr {
    Expr::Include => get_path(doc, name),
    Expr::Field(path) => get_path(doc, path),
    Expr::Literal(v) => Some(v.clone()),
    Expr::Size(path) => {
      let n = match get_path(doc, path) {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
      };
      Some(json!(n))
    }
    Expr::Sum(path) => Some(match get_path(doc, path) {
      Some(Value::Array(items)) => sum_numbers(items.iter()),
      Some(n @ Value::Number(_)) => n,
      _ => json!(0),
    }),
    Expr::First(path) => Some(match get_path(doc, path) {
      Some(Value::Array(items)) => items.into_iter().next().unwrap_or(Value::Null),
      _ => Value::Null,
    }),
    Expr::Contains { haystack, needle } => {
      if needle.is_null() {
        return Some(Value::Bool(false));
      }
      let found = match get_path(doc, haystack) {
        Some(Value::Array(items)) => items.iter().any(|i| values_equal(i, needle)),
        _ => false,
      };
      Some(Value::Bool(found))
    }
    Expr::Object(fields) => {
      let mut out = Value::Object(Map::new());
      for (key, sub) in fields {
        if let Some(v) = eval(sub, key, doc) {
          set_path(&mut out, key, v);
        }
      }
      Some(out)
    }
  }
}

fn sum_numbers<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
  let mut ints: i64 = 0;
  let mut floats = 0.0_f64;
  let mut saw_float = false;
  for v in values {
    if let Some(i) = v.as_i64() {
      ints = ints.saturating_add(i);
    } else if let Some(f) = v.as_f64() {
      floats += f;
      saw_float = true;
    }
  }
  if saw_float {
    json!(ints as f64 + floats)
  } else {
    json!(ints)
  }
}

fn compare_by(keys: &[SortKey], a: &Value, b: &Value) -> std::cmp::Ordering {
  for key in keys {
    let (va, vb) = (get_path(a, &key.field), get_path(b, &key.field));
    let ord = compare_values(va.as_ref(), vb.as_ref());
    let ord = match key.direction {
      SortDirection::Ascending => ord,
      SortDirection::Descending => ord.reverse(),
    };
    if ord.is_ne() {
      return ord;
    }
  }
  std::cmp::Ordering::Equal
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{filter::Filter, pipeline::Lookup};

  fn source() -> HashMap<Collection, Vec<Value>> {
    HashMap::from([
      (
        Collection::Users,
        vec![
          json!({ "_id": "u1", "username": "alice", "avatar": "a.png" }),
          json!({ "_id": "u2", "username": "bob", "avatar": "b.png" }),
        ],
      ),
      (
        Collection::Likes,
        vec![
          json!({ "_id": "l1", "video": "v1", "likedBy": "u2" }),
          json!({ "_id": "l2", "video": "v1", "likedBy": "u1" }),
        ],
      ),
    ])
  }

  fn videos() -> Vec<Value> {
    vec![
      json!({ "_id": "v1", "owner": "u1", "title": "one", "createdAt": "2024-01-01T00:00:00Z" }),
      json!({ "_id": "v2", "owner": "u9", "title": "two", "createdAt": "2024-01-02T00:00:00Z" }),
      json!({ "_id": "v3", "owner": "u2", "title": "three", "createdAt": "2024-01-02T00:00:00Z" }),
    ]
  }

  #[test]
  fn lookup_unwind_drops_rows_without_owner() {
    let p = Pipeline::new()
      .lookup(Lookup::new(Collection::Users, "owner", "_id", "owner"))
      .unwind("owner");
    let out = run(&p, videos(), &source()).unwrap();
    let titles: Vec<_> = out.iter().map(|d| d["title"].clone()).collect();
    assert_eq!(titles, vec![json!("one"), json!("three")]);
    assert_eq!(out[0]["owner"]["username"], json!("alice"));
  }

  #[test]
  fn counts_and_membership() {
    let p = Pipeline::new()
      .lookup(Lookup::new(Collection::Likes, "_id", "video", "likes"))
      .add_fields([
        ("likesCount", Expr::size("likes")),
        ("isLiked", Expr::contains("likes.likedBy", json!("u1"))),
        ("anon", Expr::contains("likes.likedBy", Value::Null)),
      ])
      .project([
        ("likesCount", Expr::Include),
        ("isLiked", Expr::Include),
        ("anon", Expr::Include),
      ]);
    let out = run(&p, videos(), &source()).unwrap();
    assert_eq!(out[0], json!({ "_id": "v1", "likesCount": 2, "isLiked": true, "anon": false }));
    assert_eq!(out[1]["likesCount"], json!(0));
    assert_eq!(out[1]["isLiked"], json!(false));
  }

  #[test]
  fn sort_descending_is_stable_for_ties() {
    let p = Pipeline::new().newest_first();
    let out = run(&p, videos(), &source()).unwrap();
    let ids: Vec<_> = out.iter().map(|d| d["_id"].clone()).collect();
    assert_eq!(ids, vec![json!("v2"), json!("v3"), json!("v1")]);
  }

  #[test]
  fn group_and_count_skip_empty_input() {
    let p = Pipeline::new()
      .matching(Filter::eq("owner", json!("nobody")))
      .group([("totalVideos", Accumulator::Count)]);
    assert!(run(&p, videos(), &source()).unwrap().is_empty());

    let p = Pipeline::new().count("n");
    assert_eq!(run(&p, videos(), &source()).unwrap(), vec![json!({ "n": 3 })]);
  }

  #[test]
  fn lookup_over_array_of_keys_and_replace_root() {
    let doc = json!({ "_id": "p1", "members": ["u2", "u1", "missing"] });
    let p = Pipeline::new()
      .lookup(Lookup::new(Collection::Users, "members", "_id", "people"))
      .add_fields([("firstAvatar", Expr::first("people.avatar"))])
      .unwind("people")
      .replace_root("people");
    let out = run(&p, vec![doc], &source()).unwrap();
    // Joined documents come back in the foreign collection's natural order.
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["username"], json!("alice"));
  }

  /// Counts how often each collection is asked for documents.
  struct CountingSource {
    inner: HashMap<Collection, Vec<Value>>,
    calls: std::cell::RefCell<Vec<(Collection, usize)>>,
  }

  impl CollectionSource for CountingSource {
    type Error = Infallible;

    fn matching(
      &self,
      collection: Collection,
      field: &str,
      keys: &[Value],
    ) -> Result<Vec<Value>, Infallible> {
      self.calls.borrow_mut().push((collection, keys.len()));
      self.inner.matching(collection, field, keys)
    }
  }

  #[test]
  fn lookup_fetches_once_with_distinct_keys() {
    let source = CountingSource { inner: source(), calls: Default::default() };
    let mut docs = videos();
    docs.push(json!({ "_id": "v4", "owner": "u1", "title": "four" }));
    let p = Pipeline::new().lookup(Lookup::new(Collection::Users, "owner", "_id", "owner"));
    let out = run(&p, docs, &source).unwrap();

    assert_eq!(*source.calls.borrow(), vec![(Collection::Users, 3)]);
    assert_eq!(out[3]["owner"][0]["username"], json!("alice"));
    assert_eq!(out[1]["owner"], json!([]));
  }

  #[test]
  fn lookup_without_keys_skips_the_source() {
    let source = CountingSource { inner: source(), calls: Default::default() };
    let docs = vec![json!({ "_id": "p1", "videos": [] })];
    let p = Pipeline::new().lookup(Lookup::new(Collection::Videos, "videos", "_id", "videos"));
    let out = run(&p, docs, &source).unwrap();
    assert!(source.calls.borrow().is_empty());
    assert_eq!(out[0]["videos"], json!([]));
  }

  #[test]
  fn sums_saturate_instead_of_overflowing() {
    let docs = vec![json!({ "views": i64::MAX }), json!({ "views": 5 })];
    let p = Pipeline::new().group([("totalViews", Accumulator::Sum(Expr::field("views")))]);
    let out = run(&p, docs, &source()).unwrap();
    assert_eq!(out, vec![json!({ "totalViews": i64::MAX })]);
  }
}
