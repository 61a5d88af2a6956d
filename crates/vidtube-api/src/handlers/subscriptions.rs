//! Handlers for `/subscriptions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subscriptions/c/{channelId}` | Toggle; 400 on self-subscription |
//! | `GET`  | `/subscriptions/c/{subscriberId}` | Channels the user follows |
//! | `GET`  | `/subscriptions/u/{channelId}` | Subscribers of the channel |

use axum::extract::{Path, State};
use serde_json::{Value, json};
use vidtube_core::{
  Collection,
  model::{Subscription, User},
  read_model,
  store::DocumentStore,
};

use crate::{
  ApiError, ApiResponse, AppState, Result,
  auth::{Authenticated, MaybeAuthenticated},
  db,
  extract::parse_id,
};

/// `POST /subscriptions/c/{channelId}`
pub async fn toggle<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(channel_id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let channel_id = parse_id(&channel_id, "channel")?;
  if channel_id == viewer.id {
    return Err(ApiError::validation("You cannot subscribe to your own channel"));
  }
  db::require::<User, _>(&*state.store, channel_id, "Channel").await?;

  let subscribed = db::toggle(&*state.store, &Subscription::new(viewer.id, channel_id)).await?;
  Ok(if subscribed {
    ApiResponse::created(json!({ "subscribed": true }), "Subscribed successfully")
  } else {
    ApiResponse::ok(json!({ "subscribed": false }), "Unsubscribed successfully")
  })
}

/// `GET /subscriptions/c/{subscriberId}`
pub async fn subscribed_channels<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>>
where
  S: DocumentStore + 'static,
{
  let subscriber_id = parse_id(&subscriber_id, "subscriber")?;
  let channels = db::aggregate(
    &*state.store,
    Collection::Subscriptions,
    read_model::subscribed_channels(subscriber_id),
  )
  .await?;
  Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}

/// `GET /subscriptions/u/{channelId}`
pub async fn subscribers<S>(
  State(state): State<AppState<S>>,
  _viewer: MaybeAuthenticated,
  Path(channel_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>>
where
  S: DocumentStore + 'static,
{
  let channel_id = parse_id(&channel_id, "channel")?;
  let subscribers = db::aggregate(
    &*state.store,
    Collection::Subscriptions,
    read_model::channel_subscribers(channel_id),
  )
  .await?;
  Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}
