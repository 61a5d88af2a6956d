//! The access/refresh credential lifecycle.
//!
//! Access tokens are stateless: a valid HS256 signature and an unexpired
//! `exp` are enough. Refresh tokens are additionally stored on the user
//! document as the single current value; issuing a new pair overwrites it and
//! rotation only succeeds against the stored value.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::{Document, User},
  store::{DocumentStore, WriteOutcome},
};

use crate::{Error, Result};

const REFRESH_FIELD: &str = "refreshToken";

/// Signing secrets and lifetimes for both credential classes.
#[derive(Debug, Clone)]
pub struct TokenConfig {
  pub access_secret:  String,
  pub access_ttl:     Duration,
  pub refresh_secret: String,
  pub refresh_ttl:    Duration,
}

/// Payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
  #[serde(rename = "_id")]
  pub id:        Uuid,
  pub email:     String,
  pub username:  String,
  pub full_name: String,
  pub iat:       i64,
  pub exp:       i64,
}

/// Payload of a refresh token. `jti` keeps two issuances within the same
/// second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
  #[serde(rename = "_id")]
  pub id:  Uuid,
  pub jti: Uuid,
  pub iat: i64,
  pub exp: i64,
}

/// A freshly issued credential pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
  pub access_token:  String,
  pub refresh_token: String,
}

/// The identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
  #[serde(rename = "_id")]
  pub id:        Uuid,
  pub username:  String,
  pub email:     String,
  pub full_name: String,
}

impl From<AccessClaims> for Viewer {
  fn from(c: AccessClaims) -> Self {
    Self { id: c.id, username: c.username, email: c.email, full_name: c.full_name }
  }
}

fn validation() -> Validation {
  let mut v = Validation::new(Algorithm::HS256);
  v.leeway = 0;
  v
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// Issues, verifies, rotates and revokes session credentials.
pub struct TokenManager<S> {
  store:  Arc<S>,
  config: TokenConfig,
}

impl<S: DocumentStore> TokenManager<S> {
  pub fn new(store: Arc<S>, config: TokenConfig) -> Self { Self { store, config } }

  async fn load_user(&self, id: Uuid) -> Result<Option<User>> {
    let doc = self
      .store
      .find_by_id(Collection::Users, id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    Ok(doc.map(User::from_value).transpose()?)
  }

  fn sign_pair(&self, user: &User) -> Result<TokenPair> {
    let now = Utc::now();
    let access = AccessClaims {
      id:        user.id,
      email:     user.email.clone(),
      username:  user.username.clone(),
      full_name: user.full_name.clone(),
      iat:       now.timestamp(),
      exp:       (now + self.config.access_ttl).timestamp(),
    };
    let refresh = RefreshClaims {
      id:  user.id,
      jti: Uuid::new_v4(),
      iat: now.timestamp(),
      exp: (now + self.config.refresh_ttl).timestamp(),
    };
    Ok(TokenPair {
      access_token:  encode(
        &Header::default(),
        &access,
        &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
      )?,
      refresh_token: encode(
        &Header::default(),
        &refresh,
        &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
      )?,
    })
  }

  /// Store `pair.refresh_token` on the user matched by `filter`. Returns
  /// `false` when nothing matched.
  async fn store_refresh(&self, filter: Filter, pair: &TokenPair) -> Result<bool> {
    let update = Update::new().set(REFRESH_FIELD, json!(pair.refresh_token));
    let outcome = self
      .store
      .update_one(Collection::Users, filter, update)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    Ok(matches!(outcome, WriteOutcome::Done(Some(_))))
  }

  /// Issue a new pair for `subject`, replacing any stored refresh token.
  pub async fn issue_pair(&self, subject: Uuid) -> Result<TokenPair> {
    let user = self
      .load_user(subject)
      .await?
      .ok_or(Error::SubjectNotFound(subject))?;
    let pair = self.sign_pair(&user)?;
    if !self.store_refresh(Filter::id(subject), &pair).await? {
      return Err(Error::SubjectNotFound(subject));
    }
    info!(%subject, "issued session credentials");
    Ok(pair)
  }

  /// Check an access token's signature and expiry. Touches no storage.
  pub fn verify_access(&self, token: &str) -> Result<Viewer> {
    let data = decode::<AccessClaims>(
      token,
      &DecodingKey::from_secret(self.config.access_secret.as_bytes()),
      &validation(),
    )
    .map_err(|_| Error::Unauthenticated("Invalid access token"))?;
    Ok(data.claims.into())
  }

  /// Exchange the current refresh token for a new pair. The presented token
  /// must still be the stored one; the check and the overwrite are a single
  /// conditional update, so a token can be rotated at most once.
  pub async fn rotate(&self, presented: &str) -> Result<TokenPair> {
    let claims = decode::<RefreshClaims>(
      presented,
      &DecodingKey::from_secret(self.config.refresh_secret.as_bytes()),
      &validation(),
    )
    .map_err(|_| Error::Unauthenticated("Invalid or expired refresh token"))?
    .claims;

    let user = self
      .load_user(claims.id)
      .await?
      .ok_or(Error::Unauthenticated("Invalid refresh token"))?;
    let pair = self.sign_pair(&user)?;

    let current = Filter::id(user.id).and(Filter::eq(REFRESH_FIELD, json!(presented)));
    if !self.store_refresh(current, &pair).await? {
      warn!(subject = %user.id, "rejected stale refresh token");
      return Err(Error::Unauthenticated("Refresh token is expired or already used"));
    }
    info!(subject = %user.id, "rotated session credentials");
    Ok(pair)
  }

  /// Forget the stored refresh token of `subject`. Idempotent.
  pub async fn revoke(&self, subject: Uuid) -> Result<()> {
    self
      .store
      .update_one(Collection::Users, Filter::id(subject), Update::new().unset(REFRESH_FIELD))
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    info!(%subject, "revoked session credentials");
    Ok(())
  }
}
