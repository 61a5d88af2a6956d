//! Error types for `vidtube-session`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The presented credential is missing, malformed, expired, badly signed
  /// or no longer current. The message is safe to show to clients.
  #[error("{0}")]
  Unauthenticated(&'static str),

  #[error("user not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("token encoding error: {0}")]
  Token(#[from] jsonwebtoken::errors::Error),

  #[error("password hash error: {0}")]
  PasswordHash(String),

  #[error("core error: {0}")]
  Core(#[from] vidtube_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
