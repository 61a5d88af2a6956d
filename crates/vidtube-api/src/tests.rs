//! Router-level tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use vidtube_core::{
  Collection,
  filter::Filter,
  model::{Document, User, Video},
  store::DocumentStore,
};
use vidtube_store_sqlite::SqliteStore;

use crate::{AppState, ServerConfig, router};

// ─── Harness ─────────────────────────────────────────────────────────────────

fn config(access_ttl_secs: i64) -> ServerConfig {
  ServerConfig {
    host:                      "127.0.0.1".into(),
    port:                      0,
    store_path:                ":memory:".into(),
    access_token_secret:       "access-secret".into(),
    access_token_expiry_secs:  access_ttl_secs,
    refresh_token_secret:      "refresh-secret".into(),
    refresh_token_expiry_secs: 864_000,
    secure_cookies:            true,
  }
}

async fn setup_with_ttl(access_ttl_secs: i64) -> (Router, AppState<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let state = AppState::new(store, config(access_ttl_secs));
  (router(state.clone()), state)
}

async fn setup() -> (Router, AppState<SqliteStore>) { setup_with_ttl(3600).await }

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  body:    Value,
}

impl Reply {
  fn set_cookies(&self) -> Vec<String> {
    self
      .headers
      .get_all(header::SET_COOKIE)
      .iter()
      .map(|v| v.to_str().unwrap().to_owned())
      .collect()
  }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => req.body(Body::empty()).unwrap(),
  }
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, headers, body }
}

async fn call(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> Reply {
  send(app, request(method, uri, token, body)).await
}

/// Insert a user directly and issue it a session. Skips password hashing.
async fn seed_user(state: &AppState<SqliteStore>, username: &str) -> (Uuid, String) {
  let user = User::new(
    username,
    &format!("{username}@example.com"),
    username,
    "https://cdn.example.com/avatar.png".into(),
    None,
    "not-a-real-hash".into(),
  );
  state.store.insert(Collection::Users, user.to_value().unwrap()).await.unwrap();
  let pair = state.tokens.issue_pair(user.id).await.unwrap();
  (user.id, pair.access_token)
}

async fn seed_video(state: &AppState<SqliteStore>, owner: Uuid, title: &str) -> Uuid {
  let video = Video::new(
    owner,
    title,
    "a description",
    "https://cdn.example.com/v.mp4".into(),
    "https://cdn.example.com/t.png".into(),
    42.0,
  );
  state.store.insert(Collection::Videos, video.to_value().unwrap()).await.unwrap();
  video.id
}

fn registration(username: &str, email: &str) -> Value {
  json!({
    "fullName": "Test User",
    "email":    email,
    "username": username,
    "password": "hunter22",
    "avatar":   "https://cdn.example.com/avatar.png",
  })
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthcheck_reports_ok() {
  let (app, _) = setup().await;
  let reply = call(&app, "GET", "/api/v1/healthcheck", None, None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["success"], true);
  assert_eq!(reply.body["statusCode"], 200);
  assert_eq!(reply.body["data"]["status"], "OK");
}

// ─── Accounts & sessions ─────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_registration_conflicts() {
  let (app, _) = setup().await;
  let first = call(&app, "POST", "/api/v1/users/register", None, Some(registration("alice", "a@example.com"))).await;
  assert_eq!(first.status, StatusCode::CREATED);
  assert_eq!(first.body["data"]["username"], "alice");
  assert!(first.body["data"].get("password").is_none());
  assert!(first.body["data"].get("refreshToken").is_none());

  let second = call(&app, "POST", "/api/v1/users/register", None, Some(registration("alice2", "A@Example.com"))).await;
  assert_eq!(second.status, StatusCode::CONFLICT);
  assert_eq!(second.body["success"], false);
  assert_eq!(second.body["statusCode"], 409);
  assert_eq!(second.body["errors"], json!([]));
}

#[tokio::test]
async fn registration_requires_every_field() {
  let (app, _) = setup().await;
  let mut body = registration("bob", "bob@example.com");
  body["password"] = json!("   ");
  let reply = call(&app, "POST", "/api/v1/users/register", None, Some(body)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let reply = call(&app, "POST", "/api/v1/users/register", None, Some(registration("bob", "not-an-email"))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_cookies_and_logout_revokes() {
  let (app, _) = setup().await;
  call(&app, "POST", "/api/v1/users/register", None, Some(registration("carol", "carol@example.com"))).await;

  let wrong = call(
    &app,
    "POST",
    "/api/v1/users/login",
    None,
    Some(json!({ "username": "carol", "password": "nope" })),
  )
  .await;
  assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

  let login = call(
    &app,
    "POST",
    "/api/v1/users/login",
    None,
    Some(json!({ "email": "CAROL@example.com", "password": "hunter22" })),
  )
  .await;
  assert_eq!(login.status, StatusCode::OK);
  let cookies = login.set_cookies();
  assert!(cookies.iter().any(|c| c.starts_with("accessToken=") && c.contains("HttpOnly")));
  assert!(cookies.iter().any(|c| c.starts_with("refreshToken=") && c.contains("Secure")));
  assert!(login.body["data"]["user"].get("password").is_none());

  let access = login.body["data"]["accessToken"].as_str().unwrap().to_owned();
  let refresh = login.body["data"]["refreshToken"].as_str().unwrap().to_owned();

  let me = call(&app, "GET", "/api/v1/users/current-user", Some(&access), None).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body["data"]["email"], "carol@example.com");

  let logout = Request::builder()
    .method("POST")
    .uri("/api/v1/users/logout")
    .header(header::COOKIE, format!("accessToken={access}; refreshToken={refresh}"))
    .body(Body::empty())
    .unwrap();
  let logout = send(&app, logout).await;
  assert_eq!(logout.status, StatusCode::OK);
  assert!(logout.set_cookies().iter().any(|c| c.starts_with("accessToken=")));

  let replay = call(
    &app,
    "POST",
    "/api/v1/users/refresh-token",
    None,
    Some(json!({ "refreshToken": refresh })),
  )
  .await;
  assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_access_token_is_refused_but_refresh_rotates() {
  let (app, state) = setup_with_ttl(-60).await;
  let (id, expired) = seed_user(&state, "dave").await;

  let me = call(&app, "GET", "/api/v1/users/current-user", Some(&expired), None).await;
  assert_eq!(me.status, StatusCode::UNAUTHORIZED);
  assert_eq!(me.body["success"], false);

  let stored = state.store.find_by_id(Collection::Users, id).await.unwrap().unwrap();
  let refresh = User::from_value(stored).unwrap().refresh_token.unwrap();

  let rotate = Request::builder()
    .method("POST")
    .uri("/api/v1/users/refresh-token")
    .header(header::COOKIE, format!("refreshToken={refresh}"))
    .body(Body::empty())
    .unwrap();
  let rotated = send(&app, rotate).await;
  assert_eq!(rotated.status, StatusCode::OK);
  assert!(rotated.set_cookies().iter().all(|c| c.contains("SameSite=Strict")));
  assert_ne!(rotated.body["data"]["refreshToken"], json!(refresh));

  // The superseded token is single-use.
  let replay = call(
    &app,
    "POST",
    "/api/v1/users/refresh-token",
    None,
    Some(json!({ "refreshToken": refresh })),
  )
  .await;
  assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_credentials_are_unauthenticated() {
  let (app, _) = setup().await;
  let reply = call(&app, "GET", "/api/v1/users/current-user", None, None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  let reply = call(&app, "POST", "/api/v1/users/refresh-token", None, None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stale_empty_cookie_does_not_hide_bearer_token() {
  let (app, state) = setup().await;
  let (_, access) = seed_user(&state, "ivan").await;

  let mut req = request("GET", "/api/v1/users/current-user", Some(&access), None);
  req
    .headers_mut()
    .insert(header::COOKIE, header::HeaderValue::from_static("accessToken="));
  let reply = send(&app, req).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["data"]["username"], "ivan");
}

#[tokio::test]
async fn password_confirmation_must_match() {
  let (app, state) = setup().await;
  let (_, token) = seed_user(&state, "erin").await;
  let reply = call(
    &app,
    "POST",
    "/api/v1/users/change-password",
    Some(&token),
    Some(json!({ "oldPassword": "a", "newPassword": "b", "confirmPassword": "c" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_email_must_stay_unique() {
  let (app, state) = setup().await;
  seed_user(&state, "frank").await;
  let (_, token) = seed_user(&state, "grace").await;

  let reply = call(
    &app,
    "PATCH",
    "/api/v1/users/update-account",
    Some(&token),
    Some(json!({ "fullName": "Grace H", "email": "frank@example.com" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CONFLICT);

  let reply = call(
    &app,
    "PATCH",
    "/api/v1/users/update-account",
    Some(&token),
    Some(json!({ "fullName": "Grace H", "email": "grace.h@example.com" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["data"]["fullName"], "Grace H");
}

// ─── Channels & subscriptions ────────────────────────────────────────────────

#[tokio::test]
async fn self_subscription_is_rejected() {
  let (app, state) = setup().await;
  let (me, token) = seed_user(&state, "heidi").await;
  let (other, _) = seed_user(&state, "ivan").await;

  let own = call(&app, "POST", &format!("/api/v1/subscriptions/c/{me}"), Some(&token), None).await;
  assert_eq!(own.status, StatusCode::BAD_REQUEST);

  let on = call(&app, "POST", &format!("/api/v1/subscriptions/c/{other}"), Some(&token), None).await;
  assert_eq!(on.status, StatusCode::CREATED);
  assert_eq!(on.body["data"]["subscribed"], true);

  let profile = call(&app, "GET", "/api/v1/users/c/IVAN", Some(&token), None).await;
  assert_eq!(profile.status, StatusCode::OK);
  assert_eq!(profile.body["data"]["subscribersCount"], 1);
  assert_eq!(profile.body["data"]["isSubscribed"], true);

  let subscribers = call(&app, "GET", &format!("/api/v1/subscriptions/u/{other}"), None, None).await;
  assert_eq!(subscribers.body["data"][0]["username"], "heidi");

  let off = call(&app, "POST", &format!("/api/v1/subscriptions/c/{other}"), Some(&token), None).await;
  assert_eq!(off.status, StatusCode::OK);
  assert_eq!(off.body["data"]["subscribed"], false);
}

#[tokio::test]
async fn unknown_channel_is_not_found() {
  let (app, _) = setup().await;
  let reply = call(&app, "GET", "/api/v1/users/c/nobody", None, None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ─── Videos ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn video_listing_paginates() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "judy").await;
  for i in 0..25 {
    seed_video(&state, owner, &format!("video {i}")).await;
  }

  let first = call(&app, "GET", "/api/v1/videos?page=1&limit=10", None, None).await;
  assert_eq!(first.status, StatusCode::OK);
  assert_eq!(first.body["data"]["items"].as_array().unwrap().len(), 10);
  assert_eq!(first.body["data"]["totalItems"], 25);
  assert_eq!(first.body["data"]["totalPages"], 3);
  assert_eq!(first.body["data"]["items"][0]["ownerDetails"]["username"], "judy");

  let past = call(&app, "GET", "/api/v1/videos?page=4&limit=10", None, None).await;
  assert_eq!(past.status, StatusCode::OK);
  assert!(past.body["data"]["items"].as_array().unwrap().is_empty());
  assert_eq!(past.body["data"]["totalItems"], 25);

  let bad = call(&app, "GET", "/api/v1/videos?limit=0", None, None).await;
  assert_eq!(bad.status, StatusCode::BAD_REQUEST);
  let bad = call(&app, "GET", "/api/v1/videos?sortBy=password", None, None).await;
  assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn title_sort_is_a_total_order() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "olga").await;
  let titles = ["2024-01-01T00:00:09.5Z", "2024-01-01T00:00:09Y", "2024-01-01T00:00:09Z"];
  for i in 0..30 {
    seed_video(&state, owner, titles[i % 3]).await;
  }

  let reply = call(&app, "GET", "/api/v1/videos?sortBy=title&sortType=asc&limit=30", None, None).await;
  assert_eq!(reply.status, StatusCode::OK);
  let listed: Vec<&str> = reply.body["data"]["items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v["title"].as_str().unwrap())
    .collect();
  assert_eq!(listed.len(), 30);
  assert!(listed.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn video_of_deleted_owner_is_not_found() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "mallory").await;
  let video = seed_video(&state, owner, "orphan").await;
  state.store.delete_by_id(Collection::Users, owner).await.unwrap();

  let reply = call(&app, "GET", &format!("/api/v1/videos/{video}"), None, None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reading_a_video_counts_views_and_history() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "niaj").await;
  let (viewer, token) = seed_user(&state, "olivia").await;
  let video = seed_video(&state, owner, "watched").await;

  let anon = call(&app, "GET", &format!("/api/v1/videos/{video}"), None, None).await;
  assert_eq!(anon.status, StatusCode::OK);
  assert_eq!(anon.body["data"]["isLiked"], false);
  assert_eq!(anon.body["data"]["owner"]["isSubscribed"], false);
  assert_eq!(anon.body["data"]["owner"]["username"], "niaj");

  let seen = call(&app, "GET", &format!("/api/v1/videos/{video}"), Some(&token), None).await;
  assert_eq!(seen.status, StatusCode::OK);

  let stored = state.store.find_by_id(Collection::Videos, video).await.unwrap().unwrap();
  assert_eq!(stored["views"], 2);

  let history = call(&app, "GET", "/api/v1/users/history", Some(&token), None).await;
  assert_eq!(history.body["data"][0]["_id"], json!(video));
  assert_eq!(history.body["data"][0]["owner"]["username"], "niaj");
  let user = state.store.find_by_id(Collection::Users, viewer).await.unwrap().unwrap();
  assert_eq!(user["watchHistory"], json!([video]));
}

#[tokio::test]
async fn invalid_token_on_optional_route_is_rejected() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "peggy").await;
  let video = seed_video(&state, owner, "v").await;
  let reply = call(&app, "GET", &format!("/api/v1/videos/{video}"), Some("garbage"), None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
  let (app, _) = setup().await;
  let reply = call(&app, "GET", "/api/v1/videos/not-a-uuid", None, None).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn only_the_owner_may_modify_a_video() {
  let (app, state) = setup().await;
  let (owner, owner_token) = seed_user(&state, "rupert").await;
  let (_, other_token) = seed_user(&state, "sybil").await;
  let video = seed_video(&state, owner, "mine").await;
  let uri = format!("/api/v1/videos/{video}");

  let reply = call(&app, "PATCH", &uri, Some(&other_token), Some(json!({ "title": "stolen" }))).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  let reply = call(&app, "DELETE", &uri, Some(&other_token), None).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);

  let reply = call(&app, "PATCH", &uri, Some(&owner_token), Some(json!({ "title": "renamed" }))).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["data"]["title"], "renamed");

  let toggled = call(
    &app,
    "PATCH",
    &format!("/api/v1/videos/toggle/publish/{video}"),
    Some(&owner_token),
    None,
  )
  .await;
  assert_eq!(toggled.body["data"]["isPublished"], false);

  // Unpublished videos are hidden from everyone but the owner.
  let hidden = call(&app, "GET", &uri, Some(&other_token), None).await;
  assert_eq!(hidden.status, StatusCode::NOT_FOUND);
  let visible = call(&app, "GET", &uri, Some(&owner_token), None).await;
  assert_eq!(visible.status, StatusCode::OK);
}

#[tokio::test]
async fn publishing_requires_media() {
  let (app, state) = setup().await;
  let (_, token) = seed_user(&state, "trent").await;
  let body = json!({ "title": "t", "description": "d", "thumbnail": "https://cdn/t.png" });
  let reply = call(&app, "POST", "/api/v1/videos", Some(&token), Some(body)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let body = json!({
    "title": "t",
    "description": "d",
    "videoFile": "https://cdn/v.mp4",
    "thumbnail": "https://cdn/t.png",
    "duration": 12.5,
  });
  let reply = call(&app, "POST", "/api/v1/videos", Some(&token), Some(body)).await;
  assert_eq!(reply.status, StatusCode::CREATED);
  assert_eq!(reply.body["data"]["isPublished"], true);
  assert_eq!(reply.body["data"]["views"], 0);
}

// ─── Likes & comments ────────────────────────────────────────────────────────

#[tokio::test]
async fn like_toggle_flips() {
  let (app, state) = setup().await;
  let (owner, _) = seed_user(&state, "victor").await;
  let (_, token) = seed_user(&state, "walter").await;
  let video = seed_video(&state, owner, "likeable").await;
  let uri = format!("/api/v1/likes/toggle/v/{video}");

  let on = call(&app, "POST", &uri, Some(&token), None).await;
  assert_eq!(on.status, StatusCode::CREATED);
  assert_eq!(on.body["data"]["isLiked"], true);

  let detail = call(&app, "GET", &format!("/api/v1/videos/{video}"), Some(&token), None).await;
  assert_eq!(detail.body["data"]["likesCount"], 1);
  assert_eq!(detail.body["data"]["isLiked"], true);

  let liked = call(&app, "GET", "/api/v1/likes/videos", Some(&token), None).await;
  assert_eq!(liked.body["data"][0]["title"], "likeable");

  let off = call(&app, "POST", &uri, Some(&token), None).await;
  assert_eq!(off.status, StatusCode::OK);
  assert_eq!(off.body["data"]["isLiked"], false);

  let missing = call(&app, "POST", &format!("/api/v1/likes/toggle/v/{}", Uuid::new_v4()), Some(&token), None).await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_video_cascades() {
  let (app, state) = setup().await;
  let (owner, owner_token) = seed_user(&state, "xavier").await;
  let (_, fan_token) = seed_user(&state, "yolanda").await;
  let video = seed_video(&state, owner, "doomed").await;

  call(&app, "POST", &format!("/api/v1/likes/toggle/v/{video}"), Some(&fan_token), None).await;
  let comment = call(
    &app,
    "POST",
    &format!("/api/v1/comments/{video}"),
    Some(&fan_token),
    Some(json!({ "content": "first!" })),
  )
  .await;
  assert_eq!(comment.status, StatusCode::CREATED);
  let comment_id = comment.body["data"]["_id"].as_str().unwrap().to_owned();
  call(&app, "POST", &format!("/api/v1/likes/toggle/c/{comment_id}"), Some(&owner_token), None).await;

  let playlist = call(
    &app,
    "POST",
    "/api/v1/playlists",
    Some(&owner_token),
    Some(json!({ "name": "mix", "description": "stuff" })),
  )
  .await;
  let playlist_id = playlist.body["data"]["_id"].as_str().unwrap().to_owned();
  let added = call(
    &app,
    "PATCH",
    &format!("/api/v1/playlists/add/{video}/{playlist_id}"),
    Some(&owner_token),
    None,
  )
  .await;
  assert_eq!(added.body["data"]["videos"], json!([video]));

  let deleted = call(&app, "DELETE", &format!("/api/v1/videos/{video}"), Some(&owner_token), None).await;
  assert_eq!(deleted.status, StatusCode::OK);

  assert_eq!(state.store.count(Collection::Likes, Filter::All).await.unwrap(), 0);
  assert_eq!(state.store.count(Collection::Comments, Filter::All).await.unwrap(), 0);
  let playlist = call(&app, "GET", &format!("/api/v1/playlists/{playlist_id}"), None, None).await;
  assert_eq!(playlist.body["data"]["videos"], json!([]));
}

#[tokio::test]
async fn comments_are_owned() {
  let (app, state) = setup().await;
  let (owner, owner_token) = seed_user(&state, "zara").await;
  let (_, author_token) = seed_user(&state, "amir").await;
  let (_, stranger_token) = seed_user(&state, "bea").await;
  let video = seed_video(&state, owner, "discussed").await;

  let empty = call(
    &app,
    "POST",
    &format!("/api/v1/comments/{video}"),
    Some(&author_token),
    Some(json!({ "content": "  " })),
  )
  .await;
  assert_eq!(empty.status, StatusCode::BAD_REQUEST);

  let comment = call(
    &app,
    "POST",
    &format!("/api/v1/comments/{video}"),
    Some(&author_token),
    Some(json!({ "content": "nice" })),
  )
  .await;
  let id = comment.body["data"]["_id"].as_str().unwrap().to_owned();
  let uri = format!("/api/v1/comments/c/{id}");

  let edit = call(&app, "PATCH", &uri, Some(&stranger_token), Some(json!({ "content": "mine" }))).await;
  assert_eq!(edit.status, StatusCode::FORBIDDEN);
  let delete = call(&app, "DELETE", &uri, Some(&stranger_token), None).await;
  assert_eq!(delete.status, StatusCode::FORBIDDEN);

  let listed = call(&app, "GET", &format!("/api/v1/comments/{video}"), None, None).await;
  assert_eq!(listed.body["data"]["totalItems"], 1);
  assert_eq!(listed.body["data"]["items"][0]["owner"]["username"], "amir");

  // The video owner may moderate.
  let delete = call(&app, "DELETE", &uri, Some(&owner_token), None).await;
  assert_eq!(delete.status, StatusCode::OK);

  let missing = call(&app, "GET", &format!("/api/v1/comments/{}", Uuid::new_v4()), None, None).await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

// ─── Tweets ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tweets_enforce_length_and_ownership() {
  let (app, state) = setup().await;
  let (me, token) = seed_user(&state, "carl").await;
  let (_, other_token) = seed_user(&state, "dina").await;

  let long = "x".repeat(501);
  let reply = call(&app, "POST", "/api/v1/tweets", Some(&token), Some(json!({ "content": long }))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let tweet = call(&app, "POST", "/api/v1/tweets", Some(&token), Some(json!({ "content": "hello" }))).await;
  assert_eq!(tweet.status, StatusCode::CREATED);
  let id = tweet.body["data"]["_id"].as_str().unwrap().to_owned();

  call(&app, "POST", &format!("/api/v1/likes/toggle/t/{id}"), Some(&other_token), None).await;
  let listed = call(&app, "GET", &format!("/api/v1/tweets/user/{me}"), Some(&other_token), None).await;
  assert_eq!(listed.body["data"]["items"][0]["likesCount"], 1);
  assert_eq!(listed.body["data"]["items"][0]["isLiked"], true);

  let stolen = call(&app, "DELETE", &format!("/api/v1/tweets/{id}"), Some(&other_token), None).await;
  assert_eq!(stolen.status, StatusCode::FORBIDDEN);

  let deleted = call(&app, "DELETE", &format!("/api/v1/tweets/{id}"), Some(&token), None).await;
  assert_eq!(deleted.status, StatusCode::OK);
  assert_eq!(state.store.count(Collection::Likes, Filter::All).await.unwrap(), 0);
}

// ─── Playlists & dashboard ───────────────────────────────────────────────────

#[tokio::test]
async fn playlists_are_edited_by_their_owner_only() {
  let (app, state) = setup().await;
  let (me, token) = seed_user(&state, "ella").await;
  let (_, other_token) = seed_user(&state, "finn").await;
  let video = seed_video(&state, me, "track").await;

  let missing = call(&app, "POST", "/api/v1/playlists", Some(&token), Some(json!({ "name": "x" }))).await;
  assert_eq!(missing.status, StatusCode::BAD_REQUEST);

  let created = call(
    &app,
    "POST",
    "/api/v1/playlists",
    Some(&token),
    Some(json!({ "name": "road trip", "description": "songs" })),
  )
  .await;
  let id = created.body["data"]["_id"].as_str().unwrap().to_owned();

  let foreign = call(&app, "PATCH", &format!("/api/v1/playlists/add/{video}/{id}"), Some(&other_token), None).await;
  assert_eq!(foreign.status, StatusCode::FORBIDDEN);

  for _ in 0..2 {
    let added = call(&app, "PATCH", &format!("/api/v1/playlists/add/{video}/{id}"), Some(&token), None).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["data"]["videos"], json!([video]));
  }

  let listed = call(&app, "GET", &format!("/api/v1/playlists/user/{me}"), None, None).await;
  assert_eq!(listed.body["data"][0]["totalVideos"], 1);
  assert_eq!(listed.body["data"][0]["totalViews"], 0);

  let removed = call(&app, "PATCH", &format!("/api/v1/playlists/remove/{video}/{id}"), Some(&token), None).await;
  assert_eq!(removed.body["data"]["videos"], json!([]));

  let deleted = call(&app, "DELETE", &format!("/api/v1/playlists/{id}"), Some(&other_token), None).await;
  assert_eq!(deleted.status, StatusCode::FORBIDDEN);
  let deleted = call(&app, "DELETE", &format!("/api/v1/playlists/{id}"), Some(&token), None).await;
  assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn dashboard_reports_channel_totals() {
  let (app, state) = setup().await;
  let (me, token) = seed_user(&state, "gus").await;
  let (_, fan_token) = seed_user(&state, "hana").await;
  let video = seed_video(&state, me, "hit").await;
  seed_video(&state, me, "flop").await;

  call(&app, "POST", &format!("/api/v1/subscriptions/c/{me}"), Some(&fan_token), None).await;
  call(&app, "POST", &format!("/api/v1/likes/toggle/v/{video}"), Some(&fan_token), None).await;
  call(&app, "GET", &format!("/api/v1/videos/{video}"), Some(&fan_token), None).await;

  let stats = call(&app, "GET", "/api/v1/dashboard/stats", Some(&token), None).await;
  assert_eq!(stats.status, StatusCode::OK);
  assert_eq!(
    stats.body["data"],
    json!({ "totalSubscribers": 1, "totalVideos": 2, "totalViews": 1, "totalLikes": 1 })
  );

  let videos = call(&app, "GET", "/api/v1/dashboard/videos?limit=1", Some(&token), None).await;
  assert_eq!(videos.body["data"]["totalItems"], 2);
  assert_eq!(videos.body["data"]["items"].as_array().unwrap().len(), 1);

  let (_, empty_token) = seed_user(&state, "ivy").await;
  let empty = call(&app, "GET", "/api/v1/dashboard/videos", Some(&empty_token), None).await;
  assert_eq!(empty.status, StatusCode::OK);
  assert_eq!(empty.body["data"]["totalItems"], 0);
}
