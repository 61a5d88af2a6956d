//! The success envelope.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// `{statusCode, data, message, success}`, sent with `statusCode` as the
/// HTTP status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
  pub status_code: u16,
  pub data:        T,
  pub message:     String,
  pub success:     bool,
}

impl<T: Serialize> ApiResponse<T> {
  pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
    Self {
      status_code: status.as_u16(),
      data,
      message: message.into(),
      success: status.as_u16() < 400,
    }
  }

  pub fn ok(data: T, message: impl Into<String>) -> Self {
    Self::new(StatusCode::OK, data, message)
  }

  pub fn created(data: T, message: impl Into<String>) -> Self {
    Self::new(StatusCode::CREATED, data, message)
  }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
    (status, Json(self)).into_response()
  }
}
