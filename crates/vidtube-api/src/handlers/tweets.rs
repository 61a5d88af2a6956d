//! Handlers for `/tweets` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/tweets` | Body: `{"content"}`, at most 500 characters |
//! | `GET`    | `/tweets/user/{userId}` | `?page&limit`, newest first |
//! | `PATCH`  | `/tweets/{tweetId}` | Owner only |
//! | `DELETE` | `/tweets/{tweetId}` | Owner only; cascades likes and comments |

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::{Filter, Update},
  model::{MAX_TWEET_LEN, Tweet, User},
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
pub struct TweetBody {
  pub content: Option<String>,
}

fn content(body: &TweetBody) -> Result<&str> {
  let text =
    required(&body.content).ok_or_else(|| ApiError::validation("Tweet content cannot be empty"))?;
  if text.chars().count() > MAX_TWEET_LEN {
    return Err(ApiError::validation(format!(
      "Tweet cannot exceed {MAX_TWEET_LEN} characters"
    )));
  }
  Ok(text)
}

async fn owned_tweet<S: DocumentStore>(store: &S, id: Uuid, viewer: Uuid) -> Result<Tweet> {
  let tweet = db::require::<Tweet, _>(store, id, "Tweet").await?;
  if tweet.owner != viewer {
    return Err(ApiError::forbidden("You can only modify your own tweets"));
  }
  Ok(tweet)
}

/// `POST /tweets`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Body(body): Body<TweetBody>,
) -> Result<ApiResponse<Tweet>>
where
  S: DocumentStore + 'static,
{
  let tweet = Tweet::new(viewer.id, content(&body)?);
  db::insert(&*state.store, &tweet, "Tweet already exists").await?;
  Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

/// `GET /tweets/user/{userId}`
pub async fn by_user<S>(
  State(state): State<AppState<S>>,
  viewer: MaybeAuthenticated,
  Path(user_id): Path<String>,
  Params(params): Params<PageParams>,
) -> Result<ApiResponse<Paginated<Value>>>
where
  S: DocumentStore + 'static,
{
  let user_id = parse_id(&user_id, "user")?;
  let page = params.page()?;
  db::require::<User, _>(&*state.store, user_id, "User").await?;

  let tweets = db::fetch_page(
    &*state.store,
    Collection::Tweets,
    read_model::user_tweets(user_id, viewer.id()),
    page,
  )
  .await?;
  Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

/// `PATCH /tweets/{tweetId}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
  Body(body): Body<TweetBody>,
) -> Result<ApiResponse<Tweet>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "tweet")?;
  let text = content(&body)?;
  owned_tweet(&*state.store, id, viewer.id).await?;

  let update = Update::new().set("content", json!(text));
  let tweet = db::update::<Tweet, _>(&*state.store, id, update, "Tweet").await?;
  Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

/// Remove likes and comments that point at tweet `id`. Best-effort.
async fn cascade<S: DocumentStore>(store: &S, id: Uuid) -> Result<()> {
  let comment_ids = db::ids(store, Collection::Comments, Filter::eq_id("tweet", id)).await?;
  let (likes, comment_likes, comments) = tokio::join!(
    store.delete_many(Collection::Likes, Filter::eq_id("tweet", id)),
    store.delete_many(Collection::Likes, Filter::In("comment".into(), comment_ids)),
    store.delete_many(Collection::Comments, Filter::eq_id("tweet", id)),
  );
  db::log_cascade("tweet likes", likes);
  db::log_cascade("comment likes", comment_likes);
  db::log_cascade("tweet comments", comments);
  Ok(())
}

/// `DELETE /tweets/{tweetId}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(viewer): Authenticated,
  Path(id): Path<String>,
) -> Result<ApiResponse<Value>>
where
  S: DocumentStore + 'static,
{
  let id = parse_id(&id, "tweet")?;
  let store = &*state.store;
  owned_tweet(store, id, viewer.id).await?;

  if !db::delete(store, Collection::Tweets, id).await? {
    return Err(ApiError::not_found("Tweet not found"));
  }
  db::log_cascade("tweet dependants", cascade(store, id).await);
  info!(tweet = %id, "deleted tweet");

  Ok(ApiResponse::ok(json!({}), "Tweet deleted successfully"))
}
