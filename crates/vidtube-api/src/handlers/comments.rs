//! Handlers for `/comments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/comments/{videoId}` | `?page&limit`, newest first |
//! | `POST`   | `/comments/{videoId}` | Body: `{"content"}` |
//! | `PATCH`  | `/comments/c/{commentId}` | Author only |
//! | `DELETE` | `/comments/c/{commentId}` | Author or owner of the commented video/tweet |

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::{Comment, Tweet, Video},
  page::Paginated,
  read_model,
  store::DocumentStore,
};

use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::{Authenticated, MaybeAuthenticated},
  db,
  extract::{Body, PageParams, Params, parse_id, required},
};

#[derive(Debug, Deserialize)]
pub struct ContentBody {
  pub content: Option<String>,
}

fn content(body: &ContentBody) -> Result<&str> {
  required(&body.content).ok_or_else(|| ApiError::validation("Comment content cannot be empty"))
}

/// `GET /comments/{videoId}`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Path(video_id): Path<String>,
  Params(params): Params<PageParams>,
) -> Result<ApiResponse<Paginated<Value>>>
where
  S: DocumentStore + 'static,
{
  let video_id = parse_id(&video_id, "video")?;
  let page = params.page()?;
  db::require::<Video, _>(&*state.store, video_id, "Video").await?;

  let comments = db::fetch_page(
    &*state.store,
    Collection::Comments,
    read_model::video_comments(video_id),
    page,
  )
  .await?;
  Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

/// `POST /comments/{videoId}`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(video_id): Path<String>,
  Body(body): Body<ContentBody>,
) -> Result<ApiResponse<Comment>>
where
  S: DocumentStore + 'static,
{
  let video_id = parse_id(&video_id, "video")?;
  let text = content(&body)?;
  db::require::<Video, _>(&*state.store, video_id, "Video").await?;

  let comment = Comment::on_video(video_id, viewer.id, text);
  db::insert(&*state.store, &comment, "Comment already exists").await?;
  Ok(ApiResponse::created(comment, "Comment added successfully"))
}

/// `PATCH /comments/c/{commentId}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(comment_id): Path<String>,
  Body(body): Body<ContentBody>,
) -> Result<ApiResponse<Comment>>
where
  S: DocumentStore + 'static,
{
  let comment_id = parse_id(&comment_id, "comment")?;
  let text = content(&body)?;
  let comment = db::require::<Comment, _>(&*state.store, comment_id, "Comment").await?;
  if comment.owner != viewer.id {
    return Err(ApiError::forbidden("You can only edit your own comments"));
  }

  let update = Update::new().set("content", json!(text));
  let comment = db::update::<Comment, _>(&*state.store, comment_id, update, "Comment").await?;
  Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

/// `DELETE /comments/c/{commentId}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let comment_id = parse_id(&comment_id, "comment")?;
  let store = &*state.store;
  let comment = db::require::<Comment, _>(store, comment_id, "Comment").await?;

  let parent_owner = match (comment.video, comment.tweet) {
    (Some(video), _) => db::get::<Video, _>(store, video).await?.map(|v| v.owner),
    (None, Some(tweet)) => db::get::<Tweet, _>(store, tweet).await?.map(|t| t.owner),
    (None, None) => None,
  };
  if comment.owner != viewer.id && parent_owner != Some(viewer.id) {
    return Err(ApiError::forbidden("You are not allowed to delete this comment"));
  }

  if !db::delete(store, Collection::Comments, comment_id).await? {
    return Err(ApiError::not_found("Comment not found"));
  }
  db::log_cascade(
    "comment likes",
    store.delete_many(Collection::Likes, Filter::eq_id("comment", comment_id)).await,
  );
  Ok(ApiResponse::ok(json!({}), "Comment deleted successfully"))
}
