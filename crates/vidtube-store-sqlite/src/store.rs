//! The SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;
use vidtube_core::{
  Collection,
  eval::{self, CollectionSource},
  filter::{Filter, Update},
  pipeline::Pipeline,
  store::{DocumentStore, WriteOutcome},
};

use crate::{Error, Result, schema::SCHEMA, table};

/// Index name reported when a document's `_id` is already taken.
const PRIMARY_KEY: &str = "_id";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn scan(&self, collection: Collection, filter: Filter) -> Result<Vec<Value>> {
    let rows = self
      .conn
      .call(move |conn| Ok(table::scan(conn, collection, &filter)?))
      .await?;
    Ok(rows.into_iter().map(|(_, body)| body).collect())
  }
}

fn require_id(collection: Collection, doc: &Value) -> Result<String> {
  if !doc.is_object() {
    return Err(vidtube_core::Error::NotAnObject.into());
  }
  table::doc_id(doc).ok_or(Error::MissingId(collection))
}

/// Resolves pipeline lookups with keyed queries on the connection thread.
struct Joins<'c> {
  conn: &'c rusqlite::Connection,
}

impl CollectionSource for Joins<'_> {
  type Error = rusqlite::Error;

  fn matching(
    &self,
    collection: Collection,
    field: &str,
    keys: &[Value],
  ) -> rusqlite::Result<Vec<Value>> {
    let filter = Filter::In(field.to_owned(), keys.to_vec());
    Ok(
      table::scan(self.conn, collection, &filter)?
        .into_iter()
        .map(|(_, body)| body)
        .collect(),
    )
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn insert(
    &self,
    collection: Collection,
    doc: Value,
  ) -> Result<WriteOutcome<Value>> {
    let id = require_id(collection, &doc)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if table::exists(&tx, collection, &id)? {
          return Ok(WriteOutcome::DuplicateKey(PRIMARY_KEY.to_owned()));
        }
        if let Some(index) = table::conflicting_index(&tx, collection, &doc, &id)? {
          return Ok(WriteOutcome::DuplicateKey(index.to_owned()));
        }
        table::insert_row(&tx, collection, &id, &doc)?;
        tx.commit()?;
        Ok(WriteOutcome::Done(doc))
      })
      .await?;
    Ok(outcome)
  }

  async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>> {
    Ok(self.scan(collection, Filter::id(id)).await?.into_iter().next())
  }

  async fn find_one(&self, collection: Collection, filter: Filter) -> Result<Option<Value>> {
    Ok(self.scan(collection, filter).await?.into_iter().next())
  }

  async fn find(&self, collection: Collection, filter: Filter) -> Result<Vec<Value>> {
    self.scan(collection, filter).await
  }

  async fn count(&self, collection: Collection, filter: Filter) -> Result<u64> {
    Ok(self.scan(collection, filter).await?.len() as u64)
  }

  async fn update_one(
    &self,
    collection: Collection,
    filter: Filter,
    update: Update,
  ) -> Result<WriteOutcome<Option<Value>>> {
    let now = Utc::now();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some((id, mut doc)) = table::scan(&tx, collection, &filter)?.into_iter().next()
        else {
          return Ok(WriteOutcome::Done(None));
        };
        update.apply(&mut doc, now);
        if let Some(index) = table::conflicting_index(&tx, collection, &doc, &id)? {
          return Ok(WriteOutcome::DuplicateKey(index.to_owned()));
        }
        table::replace_body(&tx, collection, &id, &doc)?;
        tx.commit()?;
        Ok(WriteOutcome::Done(Some(doc)))
      })
      .await?;
    Ok(outcome)
  }

  async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some((id, doc)) = table::scan(&tx, collection, &Filter::id(id))?.into_iter().next()
        else {
          return Ok(None);
        };
        table::delete_row(&tx, collection, &id)?;
        tx.commit()?;
        Ok(Some(doc))
      })
      .await?;
    Ok(removed)
  }

  async fn delete_many(&self, collection: Collection, filter: Filter) -> Result<u64> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        for (id, _) in table::scan(&tx, collection, &filter)? {
          if table::delete_row(&tx, collection, &id)? {
            removed += 1;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed)
  }

  async fn toggle(&self, collection: Collection, doc: Value) -> Result<bool> {
    let id = require_id(collection, &doc)?;
    let (index, key) = collection
      .unique_indexes()
      .iter()
      .find_map(|index| index.key_of(&doc).map(|key| (index.name, key)))
      .ok_or(vidtube_core::Error::NoApplicableIndex(collection))?;

    let now_present = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let present = match table::key_holder(&tx, collection, index, &key)? {
          Some(holder) => {
            table::delete_row(&tx, collection, &holder)?;
            false
          }
          None => {
            table::insert_row(&tx, collection, &id, &doc)?;
            true
          }
        };
        tx.commit()?;
        Ok(present)
      })
      .await?;
    Ok(now_present)
  }

  async fn aggregate<'a>(
    &'a self,
    collection: Collection,
    pipeline: &'a Pipeline,
  ) -> Result<Vec<Value>> {
    let pipeline = pipeline.clone();

    let docs = self
      .conn
      .call(move |conn| {
        let input: Vec<Value> = table::scan(conn, collection, &pipeline.leading_filter())?
          .into_iter()
          .map(|(_, body)| body)
          .collect();
        debug!(
          %collection,
          stages = pipeline.stages().len(),
          input = input.len(),
          "running pipeline"
        );
        Ok(eval::run(&pipeline, input, &Joins { conn })?)
      })
      .await?;
    Ok(docs)
  }

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
