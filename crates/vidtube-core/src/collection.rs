//! Collection names and the unique indexes declared on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::path::get_path;

/// A named set of documents in the store.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
  Users,
  Videos,
  Comments,
  Likes,
  Subscriptions,
  Tweets,
  Playlists,
}

/// A uniqueness constraint over one or more top-level document fields.
///
/// An index only applies to a document that carries every indexed field;
/// a like on a video is therefore never checked against the comment index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueIndex {
  pub name:   &'static str,
  pub fields: &'static [&'static str],
}

const USERS: &[UniqueIndex] = &[
  UniqueIndex { name: "username", fields: &["username"] },
  UniqueIndex { name: "email", fields: &["email"] },
];

const LIKES: &[UniqueIndex] = &[
  UniqueIndex { name: "liked_by_video", fields: &["likedBy", "video"] },
  UniqueIndex { name: "liked_by_comment", fields: &["likedBy", "comment"] },
  UniqueIndex { name: "liked_by_tweet", fields: &["likedBy", "tweet"] },
];

const SUBSCRIPTIONS: &[UniqueIndex] = &[UniqueIndex {
  name:   "subscriber_channel",
  fields: &["subscriber", "channel"],
}];

impl Collection {
  /// The unique indexes enforced by every store backend.
  pub fn unique_indexes(self) -> &'static [UniqueIndex] {
    match self {
      Self::Users => USERS,
      Self::Likes => LIKES,
      Self::Subscriptions => SUBSCRIPTIONS,
      Self::Videos | Self::Comments | Self::Tweets | Self::Playlists => &[],
    }
  }

  /// Top-level fields whose stored value is an array. Every other top-level
  /// field holds a scalar or an object.
  pub fn array_fields(self) -> &'static [&'static str] {
    match self {
      Self::Users => &["watchHistory"],
      Self::Playlists => &["videos"],
      Self::Videos | Self::Comments | Self::Likes | Self::Subscriptions | Self::Tweets => &[],
    }
  }
}

impl UniqueIndex {
  /// The encoded key of `doc` under this index, or `None` when the document
  /// lacks one of the indexed fields.
  pub fn key_of(&self, doc: &Value) -> Option<String> {
    let mut parts = Vec::with_capacity(self.fields.len());
    for field in self.fields {
      match get_path(doc, field) {
        None | Some(Value::Null) => return None,
        Some(v) => parts.push(v),
      }
    }
    Some(Value::Array(parts).to_string())
  }
}
