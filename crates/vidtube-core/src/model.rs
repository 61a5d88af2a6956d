//! Document types stored in each collection.
//!
//! Field names follow the wire format (camelCase, `_id`) because read-model
//! pipelines address fields by those names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::{Collection, Result};

/// A typed document that lives in exactly one collection.
pub trait Document: Serialize + DeserializeOwned {
  const COLLECTION: Collection;

  fn id(&self) -> Uuid;

  fn to_value(&self) -> Result<Value> { Ok(serde_json::to_value(self)?) }

  fn from_value(value: Value) -> Result<Self> {
    Ok(serde_json::from_value(value)?)
  }
}

/// Serde adapter writing timestamps in their canonical stored form.
mod stamp {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer};

  use crate::filter::timestamp;

  pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&timestamp(*at))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    DateTime::<Utc>::deserialize(d)
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A registered account; every user is also a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  #[serde(rename = "_id")]
  pub id:            Uuid,
  /// Lowercase, unique.
  pub username:      String,
  /// Lowercase, unique.
  pub email:         String,
  pub full_name:     String,
  pub avatar:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_image:   Option<String>,
  #[serde(default)]
  pub watch_history: Vec<Uuid>,
  /// Argon2 PHC string.
  #[serde(rename = "password")]
  pub password_hash: String,
  /// The single live refresh credential. Written only by the session layer.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub refresh_token: Option<String>,
  #[serde(with = "stamp")]
  pub created_at:    DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at:    DateTime<Utc>,
}

impl User {
  pub fn new(
    username: &str,
    email: &str,
    full_name: &str,
    avatar: String,
    cover_image: Option<String>,
    password_hash: String,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      username: username.trim().to_lowercase(),
      email: email.trim().to_lowercase(),
      full_name: full_name.trim().to_owned(),
      avatar,
      cover_image,
      watch_history: Vec::new(),
      password_hash,
      refresh_token: None,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for User {
  const COLLECTION: Collection = Collection::Users;

  fn id(&self) -> Uuid { self.id }
}

/// A [`User`] with credentials stripped, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
  #[serde(rename = "_id")]
  pub id:            Uuid,
  pub username:      String,
  pub email:         String,
  pub full_name:     String,
  pub avatar:        String,
  pub cover_image:   Option<String>,
  pub watch_history: Vec<Uuid>,
  #[serde(with = "stamp")]
  pub created_at:    DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at:    DateTime<Utc>,
}

impl From<User> for PublicUser {
  fn from(u: User) -> Self {
    Self {
      id:            u.id,
      username:      u.username,
      email:         u.email,
      full_name:     u.full_name,
      avatar:        u.avatar,
      cover_image:   u.cover_image,
      watch_history: u.watch_history,
      created_at:    u.created_at,
      updated_at:    u.updated_at,
    }
  }
}

// ─── Video ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
  #[serde(rename = "_id")]
  pub id:           Uuid,
  /// URL of the uploaded media; opaque to this service.
  pub video_file:   String,
  pub thumbnail:    String,
  pub title:        String,
  pub description:  String,
  /// Seconds.
  pub duration:     f64,
  #[serde(default)]
  pub views:        i64,
  #[serde(default = "default_published")]
  pub is_published: bool,
  pub owner:        Uuid,
  #[serde(with = "stamp")]
  pub created_at:   DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at:   DateTime<Utc>,
}

fn default_published() -> bool { true }

impl Video {
  pub fn new(
    owner: Uuid,
    title: &str,
    description: &str,
    video_file: String,
    thumbnail: String,
    duration: f64,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      video_file,
      thumbnail,
      title: title.trim().to_owned(),
      description: description.trim().to_owned(),
      duration,
      views: 0,
      is_published: true,
      owner,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Video {
  const COLLECTION: Collection = Collection::Videos;

  fn id(&self) -> Uuid { self.id }
}

// ─── Comment ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  #[serde(rename = "_id")]
  pub id:         Uuid,
  pub content:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video:      Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tweet:      Option<Uuid>,
  pub owner:      Uuid,
  #[serde(with = "stamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at: DateTime<Utc>,
}

impl Comment {
  pub fn on_video(video: Uuid, owner: Uuid, content: &str) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      content: content.trim().to_owned(),
      video: Some(video),
      tweet: None,
      owner,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Comment {
  const COLLECTION: Collection = Collection::Comments;

  fn id(&self) -> Uuid { self.id }
}

// ─── Tweet ───────────────────────────────────────────────────────────────────

/// Longest accepted tweet body, in characters.
pub const MAX_TWEET_LEN: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
  #[serde(rename = "_id")]
  pub id:         Uuid,
  pub content:    String,
  pub owner:      Uuid,
  #[serde(with = "stamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at: DateTime<Utc>,
}

impl Tweet {
  pub fn new(owner: Uuid, content: &str) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      content: content.trim().to_owned(),
      owner,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Tweet {
  const COLLECTION: Collection = Collection::Tweets;

  fn id(&self) -> Uuid { self.id }
}

// ─── Like ────────────────────────────────────────────────────────────────────

/// What a like points at. Exactly one target per like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
  Video(Uuid),
  Comment(Uuid),
  Tweet(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
  #[serde(rename = "_id")]
  pub id:         Uuid,
  pub liked_by:   Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video:      Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment:    Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tweet:      Option<Uuid>,
  #[serde(with = "stamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at: DateTime<Utc>,
}

impl Like {
  pub fn new(liked_by: Uuid, target: LikeTarget) -> Self {
    let now = Utc::now();
    let (video, comment, tweet) = match target {
      LikeTarget::Video(id) => (Some(id), None, None),
      LikeTarget::Comment(id) => (None, Some(id), None),
      LikeTarget::Tweet(id) => (None, None, Some(id)),
    };
    Self {
      id: Uuid::new_v4(),
      liked_by,
      video,
      comment,
      tweet,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Like {
  const COLLECTION: Collection = Collection::Likes;

  fn id(&self) -> Uuid { self.id }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// `subscriber` follows `channel`; both are users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
  #[serde(rename = "_id")]
  pub id:         Uuid,
  pub subscriber: Uuid,
  pub channel:    Uuid,
  #[serde(with = "stamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at: DateTime<Utc>,
}

impl Subscription {
  pub fn new(subscriber: Uuid, channel: Uuid) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      subscriber,
      channel,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Subscription {
  const COLLECTION: Collection = Collection::Subscriptions;

  fn id(&self) -> Uuid { self.id }
}

// ─── Playlist ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
  #[serde(rename = "_id")]
  pub id:          Uuid,
  pub name:        String,
  pub description: String,
  #[serde(default)]
  pub videos:      Vec<Uuid>,
  pub owner:       Uuid,
  #[serde(with = "stamp")]
  pub created_at:  DateTime<Utc>,
  #[serde(with = "stamp")]
  pub updated_at:  DateTime<Utc>,
}

impl Playlist {
  pub fn new(owner: Uuid, name: &str, description: &str) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.trim().to_owned(),
      description: description.trim().to_owned(),
      videos: Vec::new(),
      owner,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Document for Playlist {
  const COLLECTION: Collection = Collection::Playlists;

  fn id(&self) -> Uuid { self.id }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn like_serialises_only_its_target() {
    let user = Uuid::new_v4();
    let video = Uuid::new_v4();
    let v = Like::new(user, LikeTarget::Video(video)).to_value().unwrap();
    assert_eq!(v["video"], serde_json::json!(video));
    assert!(v.get("comment").is_none());
    assert!(v.get("tweet").is_none());
    assert!(v.get("_id").is_some());
  }

  #[test]
  fn user_normalises_identity_fields() {
    let u = User::new(
      " Hitesh ",
      "HITESH@Example.com",
      "Hitesh C",
      "https://cdn/a.png".into(),
      None,
      "hash".into(),
    );
    assert_eq!(u.username, "hitesh");
    assert_eq!(u.email, "hitesh@example.com");
    let public = serde_json::to_value(PublicUser::from(u)).unwrap();
    assert!(public.get("password").is_none());
    assert!(public.get("refreshToken").is_none());
  }

  #[test]
  fn timestamps_are_stored_fixed_width() {
    let like = Like::new(Uuid::new_v4(), LikeTarget::Tweet(Uuid::new_v4()));
    let v = like.to_value().unwrap();
    let stored = v["createdAt"].as_str().unwrap();
    assert_eq!(stored.len(), "2024-01-01T00:00:09.000000Z".len());
    assert!(stored.ends_with('Z'));
    let parsed = Like::from_value(v.clone()).unwrap();
    assert_eq!(crate::filter::timestamp(parsed.created_at), stored);
  }

  #[test]
  fn array_fields_are_declared_on_their_collection() {
    let user = User::new("a", "a@b.c", "A", "https://cdn/a.png".into(), None, "h".into());
    let playlist = Playlist::new(user.id, "mix", "songs");
    let docs = [
      (Collection::Users, user.to_value().unwrap()),
      (Collection::Playlists, playlist.to_value().unwrap()),
    ];
    for (collection, doc) in docs {
      for (field, value) in doc.as_object().unwrap() {
        assert_eq!(
          value.is_array(),
          collection.array_fields().contains(&field.as_str()),
          "{collection}.{field}"
        );
      }
    }
  }
}
