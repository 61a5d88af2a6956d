//! Handlers for `/likes` endpoints.
//!
//! Toggles answer `201 {"isLiked": true}` when a like is created and
//! `200 {"isLiked": false}` when it is removed.

use axum::extract::{Path, State};
use serde_json::{Value, json};
use uuid::Uuid;
use vidtube_core::{
  Collection,
  model::{Comment, Document, Like, LikeTarget, Tweet, Video},
  read_model,
  store::DocumentStore,
};

use crate::{
  ApiResponse, AppState, Result,
  auth::Authenticated,
  db,
  extract::parse_id,
};

/// Flip `viewer`'s like on `target` after checking that `T` with that id
/// exists.
async fn toggle<T: Document, S: DocumentStore>(
  store: &S,
  viewer: Uuid,
  target: LikeTarget,
  id: Uuid,
  what: &str,
) -> Result<ApiResponse<Value>> {
  db::require::<T, _>(store, id, what).await?;
  let liked = db::toggle(store, &Like::new(viewer, target)).await?;
  Ok(if liked {
    ApiResponse::created(json!({ "isLiked": true }), format!("{what} liked successfully"))
  } else {
    ApiResponse::ok(json!({ "isLiked": false }), format!("{what} unliked successfully"))
  })
}

/// `POST /likes/toggle/v/{videoId}`
pub async fn toggle_video<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "video")?;
  toggle::<Video, _>(&*state.store, viewer.id, LikeTarget::Video(id), id, "Video").await
}

/// `POST /likes/toggle/c/{commentId}`
pub async fn toggle_comment<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "comment")?;
  toggle::<Comment, _>(&*state.store, viewer.id, LikeTarget::Comment(id), id, "Comment").await
}

/// `POST /likes/toggle/t/{tweetId}`
pub async fn toggle_tweet<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "tweet")?;
  toggle::<Tweet, _>(&*state.store, viewer.id, LikeTarget::Tweet(id), id, "Tweet").await
}

/// `GET /likes/videos`
pub async fn liked_videos<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
) -> Result<ApiResponse<Vec<Value>>>
where
  S: DocumentStore + 'static,
{
  let videos =
    db::aggregate(&*state.store, Collection::Likes, read_model::liked_videos(viewer.id)).await?;
  Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
