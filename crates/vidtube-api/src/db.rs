//! Typed helpers over [`DocumentStore`] that speak [`ApiError`].

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::Document,
  page::{Page, Paginated},
  pipeline::Pipeline,
  read_model,
  store::{DocumentStore, WriteOutcome},
};

use crate::error::{ApiError, Result};

pub async fn get<D: Document, S: DocumentStore>(store: &S, id: Uuid) -> Result<Option<D>> {
  let doc = store.find_by_id(D::COLLECTION, id).await.map_err(ApiError::internal)?;
  Ok(doc.map(D::from_value).transpose()?)
}

/// Load `id` or fail with `NotFound("<what> not found")`.
pub async fn require<D: Document, S: DocumentStore>(store: &S, id: Uuid, what: &str) -> Result<D> {
  get(store, id)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("{what} not found")))
}

pub async fn find_one<D: Document, S: DocumentStore>(store: &S, filter: Filter) -> Result<Option<D>> {
  let doc = store.find_one(D::COLLECTION, filter).await.map_err(ApiError::internal)?;
  Ok(doc.map(D::from_value).transpose()?)
}

/// Insert `doc`; a unique-index violation becomes `Conflict(conflict)`.
pub async fn insert<D: Document, S: DocumentStore>(store: &S, doc: &D, conflict: &str) -> Result<()> {
  match store
    .insert(D::COLLECTION, doc.to_value()?)
    .await
    .map_err(ApiError::internal)?
  {
    WriteOutcome::Done(_) => Ok(()),
    WriteOutcome::DuplicateKey(_) => Err(ApiError::Conflict(conflict.to_owned())),
  }
}

/// Update document `id`, returning it as stored afterwards. A missing
/// document is `NotFound`; a unique-index violation is `Conflict`.
pub async fn update<D: Document, S: DocumentStore>(
  store: &S,
  id: Uuid,
  update: Update,
  what: &str,
) -> Result<D> {
  match store
    .update_one(D::COLLECTION, Filter::id(id), update)
    .await
    .map_err(ApiError::internal)?
  {
    WriteOutcome::Done(Some(doc)) => Ok(D::from_value(doc)?),
    WriteOutcome::Done(None) => Err(ApiError::not_found(format!("{what} not found"))),
    WriteOutcome::DuplicateKey(index) => {
      Err(ApiError::Conflict(format!("{index} is already in use")))
    }
  }
}

pub async fn delete<S: DocumentStore>(store: &S, collection: Collection, id: Uuid) -> Result<bool> {
  Ok(store.delete_by_id(collection, id).await.map_err(ApiError::internal)?.is_some())
}

/// Flip a relation document; `true` when it now exists.
pub async fn toggle<D: Document, S: DocumentStore>(store: &S, doc: &D) -> Result<bool> {
  store.toggle(D::COLLECTION, doc.to_value()?).await.map_err(ApiError::internal)
}

pub async fn aggregate<S: DocumentStore>(
  store: &S,
  collection: Collection,
  pipeline: Pipeline,
) -> Result<Vec<Value>> {
  store.aggregate(collection, &pipeline).await.map_err(ApiError::internal)
}

pub async fn fetch_page<S: DocumentStore>(
  store: &S,
  collection: Collection,
  pipeline: Pipeline,
  page: Page,
) -> Result<Paginated<Value>> {
  read_model::fetch_page(store, collection, pipeline, page)
    .await
    .map_err(ApiError::internal)
}

pub async fn fetch_one<S: DocumentStore>(
  store: &S,
  collection: Collection,
  pipeline: Pipeline,
) -> Result<Option<Value>> {
  read_model::fetch_one(store, collection, pipeline)
    .await
    .map_err(ApiError::internal)
}

/// Ids of every `collection` document matching `filter`, as filter values.
pub async fn ids<S: DocumentStore>(store: &S, collection: Collection, filter: Filter) -> Result<Vec<Value>> {
  let docs = store.find(collection, filter).await.map_err(ApiError::internal)?;
  Ok(docs.into_iter().filter_map(|d| d.get("_id").cloned()).collect())
}

/// Log a failed cascade branch. Cascades never fail the request that
/// triggered them.
pub fn log_cascade<T, E: std::fmt::Display>(what: &str, outcome: std::result::Result<T, E>) {
  if let Err(e) = outcome {
    warn!("cascade delete of {what} failed: {e}");
  }
}
