//! Handlers for `/users` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/users/register` | 409 if username or email is taken |
//! | `POST`  | `/users/login` | Sets both session cookies |
//! | `POST`  | `/users/logout` | Revokes the refresh token, clears cookies |
//! | `POST`  | `/users/refresh-token` | Refresh cookie or `{"refreshToken"}` body |
//! | `POST`  | `/users/change-password` | |
//! | `GET`   | `/users/current-user` | |
//! | `PATCH` | `/users/update-account` | `{"fullName","email"}` |
//! | `PATCH` | `/users/avatar`, `/users/cover-image` | Media URLs |
//! | `GET`   | `/users/c/{username}` | Channel profile |
//! | `GET`   | `/users/history` | Watch history |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::{PublicUser, User},
  read_model,
  store::DocumentStore,
};
use vidtube_session::{hash_password, verify_password};

use super::is_valid_email;
use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::{self, Authenticated, MaybeAuthenticated, REFRESH_COOKIE},
  db,
  extract::{Body, required},
};

const TAKEN: &str = "User with email or username already exists";

async fn load_self<S: DocumentStore>(store: &S, id: Uuid) -> Result<User> {
  db::require::<User, _>(store, id, "User").await
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
  pub full_name:   Option<String>,
  pub email:       Option<String>,
  pub username:    Option<String>,
  pub password:    Option<String>,
  pub avatar:      Option<String>,
  pub cover_image: Option<String>,
}

/// `POST /users/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Body(body): Body<RegisterBody>,
) -> Result<ApiResponse<PublicUser>>
where
  S: DocumentStore + 'static,
{
  let (Some(full_name), Some(email), Some(username), Some(password)) = (
    required(&body.full_name),
    required(&body.email),
    required(&body.username),
    required(&body.password),
  ) else {
    return Err(ApiError::validation("All fields are required"));
  };
  if !is_valid_email(email) {
    return Err(ApiError::validation("Invalid email format"));
  }
  let avatar = required(&body.avatar).ok_or_else(|| ApiError::validation("Avatar file is required"))?;

  let taken = Filter::Or(vec![
    Filter::eq("username", json!(username.to_lowercase())),
    Filter::eq("email", json!(email.to_lowercase())),
  ]);
  if db::find_one::<User, _>(&*state.store, taken).await?.is_some() {
    return Err(ApiError::Conflict(TAKEN.into()));
  }

  let user = User::new(
    username,
    email,
    full_name,
    avatar.to_owned(),
    required(&body.cover_image).map(str::to_owned),
    hash_password(password)?,
  );
  db::insert(&*state.store, &user, TAKEN).await?;
  info!(user = %user.id, username = %user.username, "registered user");

  Ok(ApiResponse::created(user.into(), "User registered successfully"))
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
}

/// `POST /users/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  Body(body): Body<LoginBody>,
) -> Result<(CookieJar, ApiResponse<Value>)>
where
  S: DocumentStore + 'static,
{
  let mut identity = Vec::new();
  if let Some(username) = required(&body.username) {
    identity.push(Filter::eq("username", json!(username.to_lowercase())));
  }
  if let Some(email) = required(&body.email) {
    identity.push(Filter::eq("email", json!(email.to_lowercase())));
  }
  if identity.is_empty() {
    return Err(ApiError::validation("Username or email is required"));
  }
  let password = required(&body.password).ok_or_else(|| ApiError::validation("Password is required"))?;

  let user = db::find_one::<User, _>(&*state.store, Filter::Or(identity))
    .await?
    .ok_or_else(|| ApiError::not_found("User does not exist"))?;
  if !verify_password(password, &user.password_hash)? {
    return Err(ApiError::Unauthenticated("Invalid user credentials".into()));
  }

  let pair = state.tokens.issue_pair(user.id).await?;
  info!(user = %user.id, "user logged in");
  let jar = auth::set_session(jar, &pair, state.config.secure_cookies, false);
  let data = json!({
    "user":         PublicUser::from(user),
    "accessToken":  pair.access_token,
    "refreshToken": pair.refresh_token,
  });
  Ok((jar, ApiResponse::ok(data, "User logged in successfully")))
}

/// `POST /users/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>)>
where
  S: DocumentStore + 'static,
{
  state.tokens.revoke(viewer.id).await?;
  Ok((auth::clear_session(jar), ApiResponse::ok(json!({}), "User logged out")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
  pub refresh_token: Option<String>,
}

/// `POST /users/refresh-token`
///
/// The refresh cookie wins over a token in the body.
pub async fn refresh_token<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  body: std::result::Result<Json<RefreshBody>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<Value>)>
where
  S: DocumentStore + 'static,
{
  let from_body = body.ok().and_then(|Json(b)| b.refresh_token);
  let presented = jar
    .get(REFRESH_COOKIE)
    .map(|c| c.value().to_owned())
    .or(from_body)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthenticated("Unauthorized request".into()))?;

  let pair = state.tokens.rotate(&presented).await?;
  let jar = auth::set_session(jar, &pair, state.config.secure_cookies, true);
  Ok((jar, ApiResponse::ok(json!(pair), "Access token refreshed")))
}

// ─── Account ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
  pub old_password:     Option<String>,
  pub new_password:     Option<String>,
  pub confirm_password: Option<String>,
}

/// `POST /users/change-password`
pub async fn change_password<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<ChangePasswordBody>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let (Some(old), Some(new)) = (required(&body.old_password), required(&body.new_password)) else {
    return Err(ApiError::validation("Old and new passwords are required"));
  };
  if required(&body.confirm_password) != Some(new) {
    return Err(ApiError::validation("New password and confirm password do not match"));
  }

  let user = load_self(&*state.store, viewer.id).await?;
  if !verify_password(old, &user.password_hash)? {
    return Err(ApiError::validation("Invalid old password"));
  }
  let update = Update::new().set("password", json!(hash_password(new)?));
  db::update::<User, _>(&*state.store, user.id, update, "User").await?;
  info!(user = %user.id, "password changed");

  Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// `GET /users/current-user`
pub async fn current_user<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
) -> Result<ApiResponse<PublicUser>>
where
  S: DocumentStore + 'static,
{
  let user = load_self(&*state.store, viewer.id).await?;
  Ok(ApiResponse::ok(user.into(), "Current user fetched successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountBody {
  pub full_name: Option<String>,
  pub email:     Option<String>,
}

/// `PATCH /users/update-account`
pub async fn update_account<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<UpdateAccountBody>,
) -> Result<ApiResponse<PublicUser>>
where
  S: DocumentStore + 'static,
{
  let (Some(full_name), Some(email)) = (required(&body.full_name), required(&body.email)) else {
    return Err(ApiError::validation("All fields are required"));
  };
  if !is_valid_email(email) {
    return Err(ApiError::validation("Invalid email format"));
  }
  let update = Update::new()
    .set("fullName", json!(full_name))
    .set("email", json!(email.to_lowercase()));
  let user = db::update::<User, _>(&*state.store, viewer.id, update, "User")
    .await
    .map_err(|e| match e {
      ApiError::Conflict(_) => ApiError::Conflict("Email is already in use".into()),
      other => other,
    })?;
  Ok(ApiResponse::ok(user.into(), "Account details updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct AvatarBody {
  pub avatar: Option<String>,
}

/// `PATCH /users/avatar`
pub async fn update_avatar<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<AvatarBody>,
) -> Result<ApiResponse<PublicUser>>
where
  S: DocumentStore + 'static,
{
  let avatar = required(&body.avatar).ok_or_else(|| ApiError::validation("Avatar file is missing"))?;
  let update = Update::new().set("avatar", json!(avatar));
  let user = db::update::<User, _>(&*state.store, viewer.id, update, "User").await?;
  Ok(ApiResponse::ok(user.into(), "Avatar updated successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImageBody {
  pub cover_image: Option<String>,
}

/// `PATCH /users/cover-image`
pub async fn update_cover_image<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<CoverImageBody>,
) -> Result<ApiResponse<PublicUser>>
where
  S: DocumentStore + 'static,
{
  let cover = required(&body.cover_image)
    .ok_or_else(|| ApiError::validation("Cover image file is missing"))?;
  let update = Update::new().set("coverImage", json!(cover));
  let user = db::update::<User, _>(&*state.store, viewer.id, update, "User").await?;
  Ok(ApiResponse::ok(user.into(), "Cover image updated successfully"))
}

// ─── Channel ─────────────────────────────────────────────────────────────────

/// `GET /users/c/{username}`
pub async fn channel_profile<S>(
  State(state): State<AppState<S>>,
  viewer: MaybeAuthenticated,
  Path(username): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let username = username.trim().to_lowercase();
  if username.is_empty() {
    return Err(ApiError::validation("Username is missing"));
  }
  let pipeline = read_model::channel_profile(&username, viewer.id());
  let channel = db::fetch_one(&*state.store, Collection::Users, pipeline)
    .await?
    .ok_or_else(|| ApiError::not_found("Channel does not exist"))?;
  Ok(ApiResponse::ok(channel, "User channel fetched successfully"))
}

/// `GET /users/history`
pub async fn watch_history<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
) -> Result<ApiResponse<Vec<Value>>>
where
  S: DocumentStore + 'static,
{
  let history =
    db::aggregate(&*state.store, Collection::Users, read_model::watch_history(viewer.id)).await?;
  Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
