//! The `DocumentStore` trait.
//!
//! Backends (e.g. `vidtube-store-sqlite`) implement it; the session layer and
//! the HTTP API depend only on this abstraction.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  Collection,
  filter::{Filter, Update},
  pipeline::Pipeline,
};

/// Result of a write that may be rejected by a unique index.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
  Done(T),
  /// The write would have violated the named unique index; nothing changed.
  DuplicateKey(String),
}

impl<T> WriteOutcome<T> {
  pub fn ok(self) -> Option<T> {
    match self {
      Self::Done(v) => Some(v),
      Self::DuplicateKey(_) => None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a collection-oriented document store.
///
/// Documents are JSON objects keyed by a string `_id`. Every single-document
/// write is atomic, and unique indexes (see [`Collection::unique_indexes`])
/// are enforced by the backend.
///
/// All methods return `Send` futures so the trait can be shared across a
/// multi-threaded runtime behind an `Arc`.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Single documents ──────────────────────────────────────────────────

  /// Persist `doc`, which must be an object carrying an `_id`.
  fn insert(
    &self,
    collection: Collection,
    doc: Value,
  ) -> impl Future<Output = Result<WriteOutcome<Value>, Self::Error>> + Send + '_;

  fn find_by_id(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_;

  /// First match in insertion order.
  fn find_one(
    &self,
    collection: Collection,
    filter: Filter,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_;

  /// Every match, in insertion order.
  fn find(
    &self,
    collection: Collection,
    filter: Filter,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  fn count(
    &self,
    collection: Collection,
    filter: Filter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Apply `update` to the first document matching `filter` and return it as
  /// stored afterwards, or `None` if nothing matched. Matching and writing
  /// happen atomically, so a filter over the current value acts as a
  /// compare-and-set.
  fn update_one(
    &self,
    collection: Collection,
    filter: Filter,
    update: Update,
  ) -> impl Future<Output = Result<WriteOutcome<Option<Value>>, Self::Error>> + Send + '_;

  /// Remove a document, returning it if it existed.
  fn delete_by_id(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_;

  /// Remove every match; returns how many were removed.
  fn delete_many(
    &self,
    collection: Collection,
    filter: Filter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Atomically insert `doc` unless a document with the same key under the
  /// collection's first applicable unique index exists, in which case that
  /// document is removed instead. Returns `true` when `doc` is now present.
  fn toggle(
    &self,
    collection: Collection,
    doc: Value,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Run `pipeline` over `collection`.
  fn aggregate<'a>(
    &'a self,
    collection: Collection,
    pipeline: &'a Pipeline,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + 'a;

  /// Cheap liveness probe.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
