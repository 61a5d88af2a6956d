//! HTTP API for vidtube.
//!
//! Exposes an axum [`Router`] mounted under `/api/v1` and backed by any
//! [`DocumentStore`]. Session credentials are issued and checked by
//! [`vidtube_session::TokenManager`].

pub mod auth;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;

pub use error::{ApiError, Result};
pub use response::ApiResponse;

use std::{path::PathBuf, sync::Arc, time::Instant};

use axum::{
  Router,
  routing::{get, patch, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vidtube_core::store::DocumentStore;
use vidtube_session::{TokenConfig, TokenManager};

use handlers::{comments, dashboard, health, likes, playlists, subscriptions, tweets, users, videos};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VIDTUBE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  pub store_path:                PathBuf,
  pub access_token_secret:       String,
  #[serde(default = "default_access_expiry")]
  pub access_token_expiry_secs:  i64,
  pub refresh_token_secret:      String,
  #[serde(default = "default_refresh_expiry")]
  pub refresh_token_expiry_secs: i64,
  /// Mark session cookies `Secure`.
  #[serde(default = "default_secure_cookies")]
  pub secure_cookies:            bool,
}

fn default_access_expiry() -> i64 { 24 * 60 * 60 }

fn default_refresh_expiry() -> i64 { 10 * 24 * 60 * 60 }

fn default_secure_cookies() -> bool { true }

impl ServerConfig {
  pub fn token_config(&self) -> TokenConfig {
    TokenConfig {
      access_secret:  self.access_token_secret.clone(),
      access_ttl:     chrono::Duration::seconds(self.access_token_expiry_secs),
      refresh_secret: self.refresh_token_secret.clone(),
      refresh_ttl:    chrono::Duration::seconds(self.refresh_token_expiry_secs),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:      Arc<S>,
  pub tokens:     Arc<TokenManager<S>>,
  pub config:     Arc<ServerConfig>,
  pub started_at: Instant,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      tokens:     self.tokens.clone(),
      config:     self.config.clone(),
      started_at: self.started_at,
    }
  }
}

impl<S: DocumentStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    let tokens = TokenManager::new(store.clone(), config.token_config());
    Self {
      store,
      tokens: Arc::new(tokens),
      config: Arc::new(config),
      started_at: Instant::now(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + 'static,
{
  Router::new()
    .nest("/api/v1", api_routes::<S>())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn api_routes<S>() -> Router<AppState<S>>
where
  S: DocumentStore + 'static,
{
  Router::new()
    .route("/healthcheck", get(health::check::<S>))
    // Users
    .route("/users/register", post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/logout", post(users::logout::<S>))
    .route("/users/refresh-token", post(users::refresh_token::<S>))
    .route("/users/change-password", post(users::change_password::<S>))
    .route("/users/current-user", get(users::current_user::<S>))
    .route("/users/update-account", patch(users::update_account::<S>))
    .route("/users/avatar", patch(users::update_avatar::<S>))
    .route("/users/cover-image", patch(users::update_cover_image::<S>))
    .route("/users/c/{username}", get(users::channel_profile::<S>))
    .route("/users/history", get(users::watch_history::<S>))
    // Videos
    .route("/videos", get(videos::list::<S>).post(videos::publish::<S>))
    .route(
      "/videos/{id}",
      get(videos::get_one::<S>).patch(videos::update::<S>).delete(videos::remove::<S>),
    )
    .route("/videos/toggle/publish/{id}", patch(videos::toggle_publish::<S>))
    // Comments
    .route("/comments/{id}", get(comments::list::<S>).post(comments::add::<S>))
    .route("/comments/c/{id}", patch(comments::update::<S>).delete(comments::remove::<S>))
    // Likes
    .route("/likes/toggle/v/{id}", post(likes::toggle_video::<S>))
    .route("/likes/toggle/c/{id}", post(likes::toggle_comment::<S>))
    .route("/likes/toggle/t/{id}", post(likes::toggle_tweet::<S>))
    .route("/likes/videos", get(likes::liked_videos::<S>))
    // Subscriptions
    .route(
      "/subscriptions/c/{id}",
      get(subscriptions::subscribed_channels::<S>).post(subscriptions::toggle::<S>),
    )
    .route("/subscriptions/u/{id}", get(subscriptions::subscribers::<S>))
    // Tweets
    .route("/tweets", post(tweets::create::<S>))
    .route("/tweets/user/{id}", get(tweets::by_user::<S>))
    .route("/tweets/{id}", patch(tweets::update::<S>).delete(tweets::remove::<S>))
    // Playlists
    .route("/playlists", post(playlists::create::<S>))
    .route(
      "/playlists/{id}",
      get(playlists::get_one::<S>)
        .patch(playlists::update::<S>)
        .delete(playlists::remove::<S>),
    )
    .route("/playlists/add/{video_id}/{playlist_id}", patch(playlists::add_video::<S>))
    .route("/playlists/remove/{video_id}/{playlist_id}", patch(playlists::remove_video::<S>))
    .route("/playlists/user/{id}", get(playlists::by_user::<S>))
    // Dashboard
    .route("/dashboard/stats", get(dashboard::stats::<S>))
    .route("/dashboard/videos", get(dashboard::videos::<S>))
}

#[cfg(test)]
mod tests;
