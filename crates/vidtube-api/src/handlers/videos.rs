//! Handlers for `/videos` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/videos` | `?page&limit&query&sortBy&sortType&userId`, published only |
//! | `POST`   | `/videos` | Body: `{"title","description","videoFile","thumbnail","duration"}` |
//! | `GET`    | `/videos/{id}` | Counts a view; 404 if the owner is gone |
//! | `PATCH`  | `/videos/{id}` | Owner only |
//! | `DELETE` | `/videos/{id}` | Owner only; cascades likes, comments, playlist entries |
//! | `PATCH`  | `/videos/toggle/publish/{id}` | Owner only |

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::Video,
  page::{Page, Paginated},
  pipeline::SortDirection,
  read_model::{self, VideoQuery, VideoSort, VideoSortField},
  store::DocumentStore,
};

use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::{Authenticated, MaybeAuthenticated},
  db,
  extract::{Body, Params, parse_id, required},
};

/// Parse `sortBy`/`sortType`; newest first when both are absent.
pub(crate) fn parse_sort(sort_by: Option<&str>, sort_type: Option<&str>) -> Result<VideoSort> {
  let field = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
    None => VideoSortField::default(),
    Some(raw) => raw
      .parse()
      .map_err(|_| ApiError::validation(format!("Cannot sort videos by {raw}")))?,
  };
  let direction = match sort_type.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
    None | Some("") | Some("desc") => SortDirection::Descending,
    Some("asc") => SortDirection::Ascending,
    Some(other) => return Err(ApiError::validation(format!("Invalid sortType {other}"))),
  };
  Ok(VideoSort { field, direction })
}

/// Load `id` and check that `viewer` owns it.
async fn owned_video<S: DocumentStore>(store: &S, id: Uuid, viewer: Uuid, action: &str) -> Result<Video> {
  let video = db::require::<Video, _>(store, id, "Video").await?;
  if video.owner != viewer {
    return Err(ApiError::forbidden(format!("You are not allowed to {action} this video")));
  }
  Ok(video)
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub page:      Option<u32>,
  pub limit:     Option<u32>,
  pub query:     Option<String>,
  pub sort_by:   Option<String>,
  pub sort_type: Option<String>,
  pub user_id:   Option<String>,
}

/// `GET /videos`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Params(params): Params<ListParams>,
) -> Result<ApiResponse<Paginated<Value>>>
where
  S: DocumentStore + 'static,
{
  let page = Page::from_query(params.page, params.limit)?;
  let owner = match required(&params.user_id) {
    Some(raw) => Some(parse_id(raw, "user")?),
    None => None,
  };
  let query = VideoQuery {
    text: required(&params.query).map(str::to_owned),
    owner,
    sort: parse_sort(params.sort_by.as_deref(), params.sort_type.as_deref())?,
  };

  let videos =
    db::fetch_page(&*state.store, Collection::Videos, read_model::video_listing(&query), page).await?;
  Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

// ─── Publish ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub video_file:  Option<String>,
  pub thumbnail:   Option<String>,
  pub duration:    Option<f64>,
}

/// `POST /videos`
pub async fn publish<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<PublishBody>,
) -> Result<ApiResponse<Video>>
where
  S: DocumentStore + 'static,
{
  let (Some(title), Some(description)) = (required(&body.title), required(&body.description)) else {
    return Err(ApiError::validation("Title and description are required"));
  };
  let video_file =
    required(&body.video_file).ok_or_else(|| ApiError::validation("Video file is required"))?;
  let thumbnail =
    required(&body.thumbnail).ok_or_else(|| ApiError::validation("Thumbnail is required"))?;
  let duration = body.duration.unwrap_or(0.0);
  if !duration.is_finite() || duration < 0.0 {
    return Err(ApiError::validation("Duration must be a non-negative number"));
  }

  let video = Video::new(
    viewer.id,
    title,
    description,
    video_file.to_owned(),
    thumbnail.to_owned(),
    duration,
  );
  db::insert(&*state.store, &video, "Video already exists").await?;
  info!(video = %video.id, owner = %viewer.id, "published video");

  Ok(ApiResponse::created(video, "Video published successfully"))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /videos/{id}`
///
/// Unpublished videos are visible to their owner only. A successful read
/// counts one view and records the video in an authenticated viewer's watch
/// history.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  viewer: MaybeAuthenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "video")?;
  let pipeline = read_model::video_detail(id, viewer.id());
  let video = db::fetch_one(&*state.store, Collection::Videos, pipeline)
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

  let published = video.get("isPublished").and_then(Value::as_bool).unwrap_or(true);
  let owner = video.pointer("/owner/_id").cloned();
  if !published && owner != viewer.id().map(|v| json!(v)) {
    return Err(ApiError::not_found("Video not found"));
  }

  let store = &*state.store;
  let count_view = store.update_one(Collection::Videos, Filter::id(id), Update::new().inc("views", 1));
  let record_history = async {
    match viewer.id() {
      Some(user) => store
        .update_one(
          Collection::Users,
          Filter::id(user),
          Update::new().add_to_set("watchHistory", json!(id)),
        )
        .await
        .map(|_| ()),
      None => Ok(()),
    }
  };
  let (viewed, recorded) = tokio::join!(count_view, record_history);
  if let Err(e) = viewed {
    warn!(video = %id, "failed to count view: {e}");
  }
  if let Err(e) = recorded {
    warn!(video = %id, "failed to record watch history: {e}");
  }

  Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub thumbnail:   Option<String>,
}

/// `PATCH /videos/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
  Body(body): Body<UpdateBody>,
) -> Result<ApiResponse<Video>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "video")?;
  owned_video(&*state.store, id, viewer.id, "update").await?;

  let mut update = Update::new();
  let mut changed = false;
  for (field, value) in [
    ("title", required(&body.title)),
    ("description", required(&body.description)),
    ("thumbnail", required(&body.thumbnail)),
  ] {
    if let Some(value) = value {
      update = update.set(field, json!(value));
      changed = true;
    }
  }
  if !changed {
    return Err(ApiError::validation("Provide a title, description or thumbnail to update"));
  }

  let video = db::update::<Video, _>(&*state.store, id, update, "Video").await?;
  Ok(ApiResponse::ok(video, "Video updated successfully"))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// Remove everything that points at video `id`. Best-effort.
async fn cascade<S: DocumentStore>(store: &S, id: Uuid) -> Result<()> {
  let comment_ids = db::ids(store, Collection::Comments, Filter::eq_id("video", id)).await?;
  let playlist_ids = db::ids(store, Collection::Playlists, Filter::eq("videos", json!(id))).await?;

  let detach = async {
    for playlist in playlist_ids {
      store
        .update_one(
          Collection::Playlists,
          Filter::eq("_id", playlist),
          Update::new().pull("videos", json!(id)),
        )
        .await?;
    }
    Ok::<_, S::Error>(())
  };

  let (likes, comment_likes, comments, playlists) = tokio::join!(
    store.delete_many(Collection::Likes, Filter::eq_id("video", id)),
    store.delete_many(Collection::Likes, Filter::In("comment".into(), comment_ids)),
    store.delete_many(Collection::Comments, Filter::eq_id("video", id)),
    detach,
  );
  db::log_cascade("video likes", likes);
  db::log_cascade("comment likes", comment_likes);
  db::log_cascade("video comments", comments);
  db::log_cascade("playlist entries", playlists);
  Ok(())
}

/// `DELETE /videos/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "video")?;
  owned_video(&*state.store, id, viewer.id, "delete").await?;

  if !db::delete(&*state.store, Collection::Videos, id).await? {
    return Err(ApiError::not_found("Video not found"));
  }
  db::log_cascade("video dependants", cascade(&*state.store, id).await);
  info!(video = %id, "deleted video");

  Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

// ─── Publish toggle ──────────────────────────────────────────────────────────

/// `PATCH /videos/toggle/publish/{id}`
pub async fn toggle_publish<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "video")?;
  let video = owned_video(&*state.store, id, viewer.id, "update").await?;

  // Conditional on the value just read, so concurrent toggles cannot both
  // flip the same way.
  let filter = Filter::id(id).and(Filter::eq("isPublished", json!(video.is_published)));
  let update = Update::new().set("isPublished", json!(!video.is_published));
  let updated = state
    .store
    .update_one(Collection::Videos, filter, update)
    .await
    .map_err(ApiError::internal)?
    .ok()
    .flatten()
    .ok_or_else(|| ApiError::Conflict("Video changed concurrently, try again".into()))?;

  let is_published = updated.get("isPublished").and_then(Value::as_bool).unwrap_or(false);
  Ok(ApiResponse::ok(
    json!({ "isPublished": is_published }),
    "Video publish status toggled successfully",
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sort_defaults_to_newest_first() {
    let sort = parse_sort(None, None).unwrap();
    assert_eq!(sort.field, VideoSortField::CreatedAt);
    assert_eq!(sort.direction, SortDirection::Descending);
  }

  #[test]
  fn sort_accepts_known_fields_only() {
    let sort = parse_sort(Some("views"), Some("asc")).unwrap();
    assert_eq!(sort.field, VideoSortField::Views);
    assert_eq!(sort.direction, SortDirection::Ascending);
    assert!(matches!(parse_sort(Some("password"), None), Err(ApiError::Validation(_))));
    assert!(matches!(parse_sort(None, Some("sideways")), Err(ApiError::Validation(_))));
  }
}
