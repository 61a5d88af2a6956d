//! Error type for `vidtube-store-sqlite`.

use thiserror::Error;
use vidtube_core::Collection;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vidtube_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Documents must be objects carrying a string `_id`.
  #[error("document for {0} has no string _id")]
  MissingId(Collection),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
