//! Request admission and session cookies.
//!
//! The access token is read from the `accessToken` cookie, falling back to an
//! `Authorization: Bearer` header. Admission only checks the token; it never
//! touches the store.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;
use vidtube_core::store::DocumentStore;
use vidtube_session::{TokenPair, Viewer};

use crate::{AppState, error::ApiError};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The raw access token presented with a request, if any. An empty cookie
/// does not hide a bearer token.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
  let jar = CookieJar::from_headers(headers);
  jar
    .get(ACCESS_COOKIE)
    .map(|c| c.value().trim().to_owned())
    .filter(|t| !t.is_empty())
    .or_else(|| {
      headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
    })
}

fn verify<S: DocumentStore>(state: &AppState<S>, token: &str) -> Result<Viewer, ApiError> {
  state.tokens.verify_access(token).map_err(|e| {
    warn!("rejected access token: {e}");
    ApiError::from(e)
  })
}

/// Present in a handler's arguments: the request carried a valid access
/// token.
pub struct Authenticated(pub Viewer);

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: DocumentStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = presented_token(&parts.headers)
      .ok_or_else(|| ApiError::Unauthenticated("Unauthorized request".into()))?;
    Ok(Authenticated(verify(state, &token)?))
  }
}

/// Optional admission: anonymous requests pass with `None`, but a presented
/// token that does not verify is still rejected.
pub struct MaybeAuthenticated(pub Option<Viewer>);

impl MaybeAuthenticated {
  pub fn id(&self) -> Option<uuid::Uuid> { self.0.as_ref().map(|v| v.id) }
}

impl<S> FromRequestParts<AppState<S>> for MaybeAuthenticated
where
  S: DocumentStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match presented_token(&parts.headers) {
      None => Ok(MaybeAuthenticated(None)),
      Some(token) => Ok(MaybeAuthenticated(Some(verify(state, &token)?))),
    }
  }
}

// ─── Cookies ─────────────────────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String, secure: bool, strict: bool) -> Cookie<'static> {
  let cookie = Cookie::build((name, value)).http_only(true).secure(secure).path("/");
  if strict {
    cookie.same_site(SameSite::Strict).build()
  } else {
    cookie.build()
  }
}

/// Set both credential cookies. Rotation passes `strict` to add
/// `SameSite=Strict`.
pub fn set_session(jar: CookieJar, pair: &TokenPair, secure: bool, strict: bool) -> CookieJar {
  jar
    .add(session_cookie(ACCESS_COOKIE, pair.access_token.clone(), secure, strict))
    .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone(), secure, strict))
}

/// Expire both credential cookies.
pub fn clear_session(jar: CookieJar) -> CookieJar {
  jar
    .remove(Cookie::build(ACCESS_COOKIE).path("/"))
    .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, header::COOKIE};

  use super::*;

  #[test]
  fn cookie_takes_precedence_over_bearer() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(presented_token(&headers).as_deref(), Some("from-header"));

    headers.insert(COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
    assert_eq!(presented_token(&headers).as_deref(), Some("from-cookie"));
  }

  #[test]
  fn empty_or_foreign_schemes_are_absent() {
    let mut headers = HeaderMap::new();
    assert_eq!(presented_token(&headers), None);
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
    assert_eq!(presented_token(&headers), None);
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(presented_token(&headers), None);
  }

  #[test]
  fn empty_cookie_falls_back_to_bearer() {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static("accessToken="));
    assert_eq!(presented_token(&headers), None);
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(presented_token(&headers).as_deref(), Some("from-header"));
  }

  #[test]
  fn rotation_cookies_are_strict() {
    let pair = TokenPair { access_token: "a".into(), refresh_token: "r".into() };
    let jar = set_session(CookieJar::new(), &pair, true, true);
    let access = jar.get(ACCESS_COOKIE).unwrap();
    assert_eq!(access.value(), "a");
    assert_eq!(access.http_only(), Some(true));
    assert_eq!(access.secure(), Some(true));
    assert_eq!(access.same_site(), Some(SameSite::Strict));
    assert_eq!(jar.get(REFRESH_COOKIE).unwrap().path(), Some("/"));
  }
}
