//! Error types for `vidtube-core`.

use thiserror::Error;

use crate::Collection;

#[derive(Debug, Error)]
pub enum Error {
  #[error("page must be >= 1, got {0}")]
  InvalidPage(u32),

  #[error("page size must be between 1 and {max}, got {got}")]
  InvalidPageSize { got: u32, max: u32 },

  #[error("document is not a JSON object")]
  NotAnObject,

  #[error("collection {0} has no unique index covering this document")]
  NoApplicableIndex(Collection),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
