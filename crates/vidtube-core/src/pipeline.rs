//! Declarative aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s describing how to turn the
//! documents of a base collection into a denormalised result set. It is a
//! plain value: builders construct it, stores execute it (see
//! [`crate::eval`]), and tests can inspect it stage by stage.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::{Collection, filter::Filter};

/// Sort direction for a [`SortKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  Ascending,
  #[default]
  Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
  pub field:     String,
  pub direction: SortDirection,
}

/// A computed value inside `add_fields`, `project` or `group` stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  /// Keep the input field of the same name (omitted when absent).
  Include,
  /// Value at a dotted path.
  Field(String),
  Literal(Value),
  /// Length of the array at a path; missing counts as zero.
  Size(String),
  /// Numeric sum of the values at a path (usually mapped over an array).
  Sum(String),
  /// First element of the array at a path, or null.
  First(String),
  /// Whether `needle` occurs in the array at `haystack`. A null needle
  /// (anonymous viewer) is never contained.
  Contains { haystack: String, needle: Value },
  /// A nested object built from named sub-expressions.
  Object(Vec<(String, Expr)>),
}

impl Expr {
  pub fn field(path: impl Into<String>) -> Self { Self::Field(path.into()) }

  pub fn size(path: impl Into<String>) -> Self { Self::Size(path.into()) }

  pub fn sum(path: impl Into<String>) -> Self { Self::Sum(path.into()) }

  pub fn first(path: impl Into<String>) -> Self { Self::First(path.into()) }

  pub fn contains(haystack: impl Into<String>, needle: Value) -> Self {
    Self::Contains { haystack: haystack.into(), needle }
  }

  pub fn object<K: Into<String>>(
    fields: impl IntoIterator<Item = (K, Expr)>,
  ) -> Self {
    Self::Object(fields.into_iter().map(|(k, e)| (k.into(), e)).collect())
  }
}

/// A per-group accumulator. Groups always collapse the whole input into one
/// output document.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
  /// Number of input documents.
  Count,
  /// Sum of an expression over the input documents.
  Sum(Expr),
}

/// A join against another collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
  pub from:          Collection,
  /// Field on the input document; may hold a scalar or an array of keys.
  pub local_field:   String,
  pub foreign_field: String,
  /// Output field receiving the array of joined documents.
  pub as_field:      String,
  /// Applied to the joined documents before they are embedded.
  pub pipeline:      Pipeline,
}

impl Lookup {
  pub fn new(
    from: Collection,
    local_field: impl Into<String>,
    foreign_field: impl Into<String>,
    as_field: impl Into<String>,
  ) -> Self {
    Self {
      from,
      local_field: local_field.into(),
      foreign_field: foreign_field.into(),
      as_field: as_field.into(),
      pipeline: Pipeline::new(),
    }
  }

  pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
    self.pipeline = pipeline;
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
  Match(Filter),
  Lookup(Lookup),
  /// Replace an array field by each of its elements in turn. Documents whose
  /// array is empty or missing are dropped unless `preserve_empty`.
  Unwind { path: String, preserve_empty: bool },
  AddFields(Vec<(String, Expr)>),
  /// Keep `_id` plus the listed fields.
  Project(Vec<(String, Expr)>),
  Sort(Vec<SortKey>),
  Skip(u64),
  Limit(u64),
  /// Replace each document with the object at a path; documents without
  /// one are dropped.
  ReplaceRoot(String),
  Group(Vec<(String, Accumulator)>),
  /// Emit `{field: n}` for the number of input documents; nothing when the
  /// input is empty.
  Count(String),
}

/// An ordered, composable list of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
  stages: Vec<Stage>,
}

fn named<K: Into<String>>(
  fields: impl IntoIterator<Item = (K, Expr)>,
) -> Vec<(String, Expr)> {
  fields.into_iter().map(|(k, e)| (k.into(), e)).collect()
}

impl Pipeline {
  pub fn new() -> Self { Self::default() }

  pub fn stages(&self) -> &[Stage] { &self.stages }

  pub fn push(mut self, stage: Stage) -> Self {
    self.stages.push(stage);
    self
  }

  pub fn matching(self, filter: Filter) -> Self { self.push(Stage::Match(filter)) }

  pub fn lookup(self, lookup: Lookup) -> Self { self.push(Stage::Lookup(lookup)) }

  /// Flatten a one-to-one join; rows without a joined document are dropped.
  pub fn unwind(self, path: impl Into<String>) -> Self {
    self.push(Stage::Unwind { path: path.into(), preserve_empty: false })
  }

  pub fn add_fields<K: Into<String>>(
    self,
    fields: impl IntoIterator<Item = (K, Expr)>,
  ) -> Self {
    self.push(Stage::AddFields(named(fields)))
  }

  pub fn project<K: Into<String>>(
    self,
    fields: impl IntoIterator<Item = (K, Expr)>,
  ) -> Self {
    self.push(Stage::Project(named(fields)))
  }

  pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
    self.push(Stage::Sort(vec![SortKey { field: field.into(), direction }]))
  }

  /// Newest first by `createdAt`.
  pub fn newest_first(self) -> Self {
    self.sort("createdAt", SortDirection::Descending)
  }

  pub fn skip(self, n: u64) -> Self { self.push(Stage::Skip(n)) }

  pub fn limit(self, n: u64) -> Self { self.push(Stage::Limit(n)) }

  pub fn replace_root(self, path: impl Into<String>) -> Self {
    self.push(Stage::ReplaceRoot(path.into()))
  }

  pub fn group<K: Into<String>>(
    self,
    fields: impl IntoIterator<Item = (K, Accumulator)>,
  ) -> Self {
    self.push(Stage::Group(
      fields.into_iter().map(|(k, a)| (k.into(), a)).collect(),
    ))
  }

  pub fn count(self, field: impl Into<String>) -> Self {
    self.push(Stage::Count(field.into()))
  }

  /// The conjunction of the match stages that open this pipeline. Backends
  /// use it to narrow the base collection before evaluation.
  pub fn leading_filter(&self) -> Filter {
    self
      .stages
      .iter()
      .map_while(|stage| match stage {
        Stage::Match(filter) => Some(filter.clone()),
        _ => None,
      })
      .fold(Filter::All, Filter::and)
  }

  /// Every collection joined by this pipeline, including nested lookups.
  pub fn joined_collections(&self) -> BTreeSet<Collection> {
    let mut out = BTreeSet::new();
    for stage in &self.stages {
      if let Stage::Lookup(lookup) = stage {
        out.insert(lookup.from);
        out.extend(lookup.pipeline.joined_collections());
      }
    }
    out
  }
}
