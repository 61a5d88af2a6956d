//! Handlers for `/playlists` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/playlists` | Body: `{"name","description"}` |
//! | `GET`    | `/playlists/{id}` | With videos and their owners |
//! | `PATCH`  | `/playlists/{id}` | Owner only |
//! | `DELETE` | `/playlists/{id}` | Owner only |
//! | `PATCH`  | `/playlists/add/{videoId}/{playlistId}` | Owner only, idempotent |
//! | `PATCH`  | `/playlists/remove/{videoId}/{playlistId}` | Owner only |
//! | `GET`    | `/playlists/user/{userId}` | With totals and a cover thumbnail |

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::Update,
  model::{Playlist, User, Video},
  read_model,
  store::DocumentStore,
};

use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::{Authenticated, MaybeAuthenticated},
  db,
  extract::{Body, parse_id, required},
};

#[derive(Debug, Deserialize)]
pub struct PlaylistBody {
  pub name:        Option<String>,
  pub description: Option<String>,
}

impl PlaylistBody {
  fn fields(&self) -> Result<(&str, &str)> {
    match (required(&self.name), required(&self.description)) {
      (Some(name), Some(description)) => Ok((name, description)),
      _ => Err(ApiError::validation("Name and description are required")),
    }
  }
}

async fn owned_playlist<S: DocumentStore>(store: &S, id: Uuid, viewer: Uuid) -> Result<Playlist> {
  let playlist = db::require::<Playlist, _>(store, id, "Playlist").await?;
  if playlist.owner != viewer {
    return Err(ApiError::forbidden("You can only modify your own playlists"));
  }
  Ok(playlist)
}

/// `POST /playlists`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<PlaylistBody>,
) -> Result<ApiResponse<Playlist>>
where
  S: DocumentStore + 'static,
{
  let (name, description) = body.fields()?;
  let playlist = Playlist::new(viewer.id, name, description);
  db::insert(&*state.store, &playlist, "Playlist already exists").await?;
  Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

/// `GET /playlists/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "playlist")?;
  let playlist = db::fetch_one(&*state.store, Collection::Playlists, read_model::playlist_detail(id))
    .await?
    .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
  Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

/// `PATCH /playlists/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
  Body(body): Body<PlaylistBody>,
) -> Result<ApiResponse<Playlist>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "playlist")?;
  let (name, description) = body.fields()?;
  owned_playlist(&*state.store, id, viewer.id).await?;

  let update = Update::new()
    .set("name", json!(name))
    .set("description", json!(description));
  let playlist = db::update::<Playlist, _>(&*state.store, id, update, "Playlist").await?;
  Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

/// `DELETE /playlists/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "playlist")?;
  owned_playlist(&*state.store, id, viewer.id).await?;
  if !db::delete(&*state.store, Collection::Playlists, id).await? {
    return Err(ApiError::not_found("Playlist not found"));
  }
  Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

/// Shared body of the add/remove endpoints.
async fn edit_videos<S: DocumentStore>(
  store: &S,
  viewer: Uuid,
  video_id: &str,
  playlist_id: &str,
  add: bool,
) -> Result<Playlist> {
  let video_id = parse_id(video_id, "video")?;
  let playlist_id = parse_id(playlist_id, "playlist")?;
  owned_playlist(store, playlist_id, viewer).await?;
  if add {
    db::require::<Video, _>(store, video_id, "Video").await?;
  }

  let update = if add {
    Update::new().add_to_set("videos", json!(video_id))
  } else {
    Update::new().pull("videos", json!(video_id))
  };
  db::update::<Playlist, _>(store, playlist_id, update, "Playlist").await
}

/// `PATCH /playlists/add/{videoId}/{playlistId}`
pub async fn add_video<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>>
where
  S: DocumentStore + 'static,
{
  let playlist = edit_videos(&*state.store, viewer.id, &video_id, &playlist_id, true).await?;
  Ok(ApiResponse::ok(playlist, "Video added to playlist successfully"))
}

/// `PATCH /playlists/remove/{videoId}/{playlistId}`
pub async fn remove_video<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>>
where
  S: DocumentStore + 'static,
{
  let playlist = edit_videos(&*state.store, viewer.id, &video_id, &playlist_id, false).await?;
  Ok(ApiResponse::ok(playlist, "Video removed from playlist successfully"))
}

/// `GET /playlists/user/{userId}`
pub async fn by_user<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>>
where
  S: DocumentStore + 'static,
{
  let user_id = parse_id(&user_id, "user")?;
  db::require::<User, _>(&*state.store, user_id, "User").await?;
  let playlists =
    db::aggregate(&*state.store, Collection::Playlists, read_model::user_playlists(user_id)).await?;
  Ok(ApiResponse::ok(playlists, "User playlists fetched successfully"))
}
