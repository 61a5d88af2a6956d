//! Request extractors that reject with [`ApiError`] instead of axum's plain
//! text rejections.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Query, Request},
  http::request::Parts,
};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;
use vidtube_core::page::Page;

use crate::error::{ApiError, Result};

/// A JSON request body.
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state).await?;
    Ok(Body(value))
  }
}

/// A query string.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
    Ok(Params(value))
  }
}

/// `?page=&limit=`.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

impl PageParams {
  pub fn page(&self) -> Result<Page> { Ok(Page::from_query(self.page, self.limit)?) }
}

/// Parse a path segment as a document id; `what` names the resource in the
/// error message.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
  Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation(format!("Invalid {what} id")))
}

/// The trimmed value of a required text field, or `None` when it is absent
/// or blank.
pub fn required(field: &Option<String>) -> Option<&str> {
  field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
