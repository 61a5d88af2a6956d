//! Handlers for `/dashboard` endpoints: the authenticated creator's own
//! channel.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use vidtube_core::{
  Collection,
  page::{Page, Paginated},
  read_model::{self, ChannelStats},
  store::DocumentStore,
};

use super::videos::parse_sort;
use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::Authenticated,
  db,
  extract::Params,
};

/// `GET /dashboard/stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
) -> Result<ApiResponse<ChannelStats>>
where
  S: DocumentStore + 'static,
{
  let stats = read_model::channel_stats(&*state.store, viewer.id)
    .await
    .map_err(ApiError::internal)?;
  Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideosParams {
  pub page:      Option<u32>,
  pub limit:     Option<u32>,
  pub sort_by:   Option<String>,
  pub sort_type: Option<String>,
}

/// `GET /dashboard/videos`
///
/// Published and unpublished alike. A channel without videos gets an empty
/// page.
pub async fn videos<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Params(params): Params<VideosParams>,
) -> Result<ApiResponse<Paginated<Value>>>
where
  S: DocumentStore + 'static,
{
  let page = Page::from_query(params.page, params.limit)?;
  let sort = parse_sort(params.sort_by.as_deref(), params.sort_type.as_deref())?;
  let videos = db::fetch_page(
    &*state.store,
    Collection::Videos,
    read_model::channel_videos(viewer.id, sort),
    page,
  )
  .await?;
  Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
