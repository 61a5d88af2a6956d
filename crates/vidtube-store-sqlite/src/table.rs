//! Synchronous row helpers. Everything here runs on the `tokio-rusqlite`
//! connection thread, usually inside a transaction.

use rusqlite::{
  Connection, OptionalExtension as _, params, params_from_iter, types::Value as SqlValue,
};
use serde_json::Value;
use vidtube_core::{Collection, filter::Filter};

use crate::query;

/// The string `_id` of a document.
pub fn doc_id(doc: &Value) -> Option<String> {
  doc.get("_id").and_then(Value::as_str).map(str::to_owned)
}

/// Every `(doc_id, body)` of `collection` matching `filter`, in insertion
/// order. Whatever part of `filter` has a SQL form narrows the query.
pub fn scan(
  conn: &Connection,
  collection: Collection,
  filter: &Filter,
) -> rusqlite::Result<Vec<(String, Value)>> {
  let mut sql = String::from("SELECT doc_id, body FROM documents WHERE collection = ?");
  let mut params = vec![SqlValue::Text(collection.as_ref().to_owned())];
  if let Some(cond) = query::condition(collection, filter) {
    sql.push_str(&format!(" AND ({})", cond.sql));
    params.extend(cond.params);
  }
  sql.push_str(" ORDER BY seq");

  let mut stmt = conn.prepare_cached(&sql)?;
  let rows: Vec<(String, Value)> = stmt
    .query_map(params_from_iter(params), |r| Ok((r.get(0)?, r.get(1)?)))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(rows.into_iter().filter(|(_, body)| filter.matches(body)).collect())
}

pub fn exists(conn: &Connection, collection: Collection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM documents WHERE collection = ?1 AND doc_id = ?2",
        params![collection.as_ref(), id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// The document currently holding `key` under `index_name`, if any.
pub fn key_holder(
  conn: &Connection,
  collection: Collection,
  index_name: &str,
  key: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT doc_id FROM unique_keys
       WHERE collection = ?1 AND index_name = ?2 AND key = ?3",
      params![collection.as_ref(), index_name, key],
      |r| r.get(0),
    )
    .optional()
}

/// The first unique index under which `doc` would collide with a document
/// other than `id`.
pub fn conflicting_index(
  conn: &Connection,
  collection: Collection,
  doc: &Value,
  id: &str,
) -> rusqlite::Result<Option<&'static str>> {
  for index in collection.unique_indexes() {
    let Some(key) = index.key_of(doc) else { continue };
    if key_holder(conn, collection, index.name, &key)?.is_some_and(|holder| holder != id) {
      return Ok(Some(index.name));
    }
  }
  Ok(None)
}

/// Replace the unique keys recorded for `id` with those of `doc`.
pub fn write_keys(
  conn: &Connection,
  collection: Collection,
  id: &str,
  doc: &Value,
) -> rusqlite::Result<()> {
  conn.execute(
    "DELETE FROM unique_keys WHERE collection = ?1 AND doc_id = ?2",
    params![collection.as_ref(), id],
  )?;
  for index in collection.unique_indexes() {
    if let Some(key) = index.key_of(doc) {
      conn.execute(
        "INSERT INTO unique_keys (collection, index_name, key, doc_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![collection.as_ref(), index.name, key, id],
      )?;
    }
  }
  Ok(())
}

pub fn insert_row(
  conn: &Connection,
  collection: Collection,
  id: &str,
  doc: &Value,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3)",
    params![collection.as_ref(), id, doc],
  )?;
  write_keys(conn, collection, id, doc)
}

pub fn replace_body(
  conn: &Connection,
  collection: Collection,
  id: &str,
  doc: &Value,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE documents SET body = ?3 WHERE collection = ?1 AND doc_id = ?2",
    params![collection.as_ref(), id, doc],
  )?;
  write_keys(conn, collection, id, doc)
}

/// Remove a document and its unique keys. Returns whether a row existed.
pub fn delete_row(
  conn: &Connection,
  collection: Collection,
  id: &str,
) -> rusqlite::Result<bool> {
  let removed = conn.execute(
    "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
    params![collection.as_ref(), id],
  )?;
  conn.execute(
    "DELETE FROM unique_keys WHERE collection = ?1 AND doc_id = ?2",
    params![collection.as_ref(), id],
  )?;
  Ok(removed > 0)
}
