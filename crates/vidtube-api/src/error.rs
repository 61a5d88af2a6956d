//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered with the error envelope
//! `{statusCode, message, success: false, errors: []}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Unauthenticated(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

impl ApiError {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

  pub fn not_found(msg: impl Into<String>) -> Self { Self::NotFound(msg.into()) }

  /// Box a backend error.
  pub fn internal<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Internal(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<vidtube_core::Error> for ApiError {
  fn from(e: vidtube_core::Error) -> Self {
    use vidtube_core::Error as Core;
    match e {
      Core::InvalidPage(_) | Core::InvalidPageSize { .. } => Self::Validation(e.to_string()),
      other => Self::internal(other),
    }
  }
}

impl From<vidtube_session::Error> for ApiError {
  fn from(e: vidtube_session::Error) -> Self {
    use vidtube_session::Error as Session;
    match e {
      Session::Unauthenticated(msg) => Self::Unauthenticated(msg.to_owned()),
      Session::SubjectNotFound(_) => Self::not_found("User not found"),
      other => Self::internal(other),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::Validation(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::Validation(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Internal(e) => {
        error!(error = %e, "request failed");
        "Internal server error".to_owned()
      }
      other => other.to_string(),
    };
    let body = json!({
      "statusCode": status.as_u16(),
      "message":    message,
      "success":    false,
      "errors":     [],
    });
    (status, Json(body)).into_response()
  }
}
