//! Denormalised read models.
//!
//! Each builder returns a [`Pipeline`] describing one response shape; the
//! `fetch_*` helpers run a pipeline against a [`DocumentStore`] and apply
//! pagination. Builders never touch storage, so they can be tested by
//! inspecting the stages they produce.

use serde::Serialize;
use serde_json::{Value, json};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{
  Collection,
  filter::Filter,
  page::{Page, Paginated},
  pipeline::{Accumulator, Expr, Lookup, Pipeline, SortDirection, SortKey, Stage},
  store::DocumentStore,
};

/// Label of the count emitted by [`fetch_page`]'s totals query.
const TOTAL_ITEMS: &str = "totalItems";

fn viewer_needle(viewer: Option<Uuid>) -> Value {
  viewer.map(|v| json!(v)).unwrap_or(Value::Null)
}

fn owner_summary(fields: &[&str]) -> Pipeline {
  Pipeline::new().project(fields.iter().map(|f| (*f, Expr::Include)))
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Run `pipeline` over `collection` and cut one page out of the result.
///
/// Totals come from a separate counting run of the same pipeline, so
/// `total_items` is exact even when `page` lies past the end.
pub async fn fetch_page<S: DocumentStore>(
  store: &S,
  collection: Collection,
  pipeline: Pipeline,
  page: Page,
) -> Result<Paginated<Value>, S::Error> {
  let counting = pipeline.clone().count(TOTAL_ITEMS);
  let total = store
    .aggregate(collection, &counting)
    .await?
    .first()
    .and_then(|d| d.get(TOTAL_ITEMS))
    .and_then(Value::as_u64)
    .unwrap_or(0);

  if page.offset() >= total {
    return Ok(Paginated::new(Vec::new(), page, total));
  }

  let window = pipeline.skip(page.offset()).limit(u64::from(page.size()));
  let items = store.aggregate(collection, &window).await?;
  Ok(Paginated::new(items, page, total))
}

/// Run `pipeline` and return its first result, if any.
pub async fn fetch_one<S: DocumentStore>(
  store: &S,
  collection: Collection,
  pipeline: Pipeline,
) -> Result<Option<Value>, S::Error> {
  let pipeline = pipeline.limit(1);
  Ok(store.aggregate(collection, &pipeline).await?.into_iter().next())
}

// ─── Videos ──────────────────────────────────────────────────────────────────

/// Sortable video fields accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum VideoSortField {
  #[default]
  CreatedAt,
  Views,
  Duration,
  Title,
}

/// A client-chosen ordering for video lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSort {
  pub field:     VideoSortField,
  pub direction: SortDirection,
}

impl VideoSort {
  fn key(self) -> SortKey {
    SortKey { field: self.field.as_ref().to_owned(), direction: self.direction }
  }
}

/// Criteria for the public video listing.
#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
  /// Free-text search over title and description.
  pub text:  Option<String>,
  pub owner: Option<Uuid>,
  pub sort:  VideoSort,
}

/// Published videos with their owner's username and avatar.
pub fn video_listing(query: &VideoQuery) -> Pipeline {
  let mut filter = Filter::eq("isPublished", json!(true));
  if let Some(owner) = query.owner {
    filter = filter.and(Filter::eq_id("owner", owner));
  }
  if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
    filter = filter.and(Filter::text(&["title", "description"], text));
  }

  Pipeline::new()
    .matching(filter)
    .lookup(
      Lookup::new(Collection::Users, "owner", "_id", "ownerDetails")
        .with_pipeline(owner_summary(&["username", "avatar"])),
    )
    .unwind("ownerDetails")
    .push(Stage::Sort(vec![query.sort.key()]))
}

/// One video with like totals and its owner's channel summary, both relative
/// to `viewer`. Yields nothing when the owner no longer exists.
pub fn video_detail(video: Uuid, viewer: Option<Uuid>) -> Pipeline {
  let needle = viewer_needle(viewer);
  let channel = Pipeline::new()
    .lookup(Lookup::new(Collection::Subscriptions, "_id", "channel", "subscribers"))
    .add_fields([
      ("subscribersCount", Expr::size("subscribers")),
      ("isSubscribed", Expr::contains("subscribers.subscriber", needle.clone())),
    ])
    .project([
      ("username", Expr::Include),
      ("avatar", Expr::Include),
      ("subscribersCount", Expr::Include),
      ("isSubscribed", Expr::Include),
    ]);

  Pipeline::new()
    .matching(Filter::id(video))
    .lookup(Lookup::new(Collection::Likes, "_id", "video", "likes"))
    .lookup(
      Lookup::new(Collection::Users, "owner", "_id", "ownerDetails")
        .with_pipeline(channel),
    )
    .unwind("ownerDetails")
    .add_fields([
      ("likesCount", Expr::size("likes")),
      ("isLiked", Expr::contains("likes.likedBy", needle)),
    ])
    .project([
      ("videoFile", Expr::Include),
      ("thumbnail", Expr::Include),
      ("title", Expr::Include),
      ("description", Expr::Include),
      ("views", Expr::Include),
      ("duration", Expr::Include),
      ("isPublished", Expr::Include),
      ("createdAt", Expr::Include),
      ("owner", Expr::field("ownerDetails")),
      ("likesCount", Expr::Include),
      ("isLiked", Expr::Include),
    ])
}

/// Every video of `owner`, published or not, with like counts.
pub fn channel_videos(owner: Uuid, sort: VideoSort) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("owner", owner))
    .lookup(Lookup::new(Collection::Likes, "_id", "video", "likes"))
    .add_fields([("likesCount", Expr::size("likes"))])
    .project([
      ("title", Expr::Include),
      ("thumbnail", Expr::Include),
      ("duration", Expr::Include),
      ("views", Expr::Include),
      ("isPublished", Expr::Include),
      ("createdAt", Expr::Include),
      ("likesCount", Expr::Include),
    ])
    .push(Stage::Sort(vec![sort.key()]))
}

// ─── Users & channels ────────────────────────────────────────────────────────

/// A channel page: profile plus subscription counts relative to `viewer`.
pub fn channel_profile(username: &str, viewer: Option<Uuid>) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq("username", json!(username.trim().to_lowercase())))
    .lookup(Lookup::new(Collection::Subscriptions, "_id", "channel", "subscribers"))
    .lookup(Lookup::new(Collection::Subscriptions, "_id", "subscriber", "subscribedTo"))
    .add_fields([
      ("subscribersCount", Expr::size("subscribers")),
      ("channelsSubscribedToCount", Expr::size("subscribedTo")),
      (
        "isSubscribed",
        Expr::contains("subscribers.subscriber", viewer_needle(viewer)),
      ),
    ])
    .project([
      ("fullName", Expr::Include),
      ("username", Expr::Include),
      ("email", Expr::Include),
      ("avatar", Expr::Include),
      ("coverImage", Expr::Include),
      ("subscribersCount", Expr::Include),
      ("channelsSubscribedToCount", Expr::Include),
      ("isSubscribed", Expr::Include),
    ])
}

/// The videos in `user`'s watch history, each with a summary of its owner.
pub fn watch_history(user: Uuid) -> Pipeline {
  let video = Pipeline::new()
    .lookup(
      Lookup::new(Collection::Users, "owner", "_id", "owner")
        .with_pipeline(owner_summary(&["fullName", "username", "avatar"])),
    )
    .add_fields([("owner", Expr::first("owner"))]);

  Pipeline::new()
    .matching(Filter::id(user))
    .lookup(
      Lookup::new(Collection::Videos, "watchHistory", "_id", "watchHistory")
        .with_pipeline(video),
    )
    .unwind("watchHistory")
    .replace_root("watchHistory")
}

/// Videos liked by `user`, most recently liked first.
pub fn liked_videos(user: Uuid) -> Pipeline {
  let video = Pipeline::new()
    .lookup(Lookup::new(Collection::Users, "owner", "_id", "ownerDetails"))
    .unwind("ownerDetails");

  Pipeline::new()
    .matching(Filter::eq_id("likedBy", user).and(Filter::exists("video")))
    .lookup(
      Lookup::new(Collection::Videos, "video", "_id", "likedVideo")
        .with_pipeline(video),
    )
    .unwind("likedVideo")
    .newest_first()
    .project([
      ("_id", Expr::field("likedVideo._id")),
      ("title", Expr::field("likedVideo.title")),
      ("thumbnail", Expr::field("likedVideo.thumbnail")),
      ("duration", Expr::field("likedVideo.duration")),
      ("views", Expr::field("likedVideo.views")),
      ("likedAt", Expr::field("createdAt")),
      (
        "owner",
        Expr::object([
          ("username", Expr::field("likedVideo.ownerDetails.username")),
          ("fullName", Expr::field("likedVideo.ownerDetails.fullName")),
          ("avatar", Expr::field("likedVideo.ownerDetails.avatar")),
        ]),
      ),
    ])
}

// ─── Comments & tweets ───────────────────────────────────────────────────────

/// Comments on `video`, newest first, each with its author.
pub fn video_comments(video: Uuid) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("video", video))
    .lookup(
      Lookup::new(Collection::Users, "owner", "_id", "ownerDetails")
        .with_pipeline(owner_summary(&["username", "avatar"])),
    )
    .unwind("ownerDetails")
    .project([
      ("content", Expr::Include),
      ("createdAt", Expr::Include),
      ("owner", Expr::field("ownerDetails")),
    ])
    .newest_first()
}

/// Tweets of `owner`, newest first, with like and comment counts.
pub fn user_tweets(owner: Uuid, viewer: Option<Uuid>) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("owner", owner))
    .lookup(
      Lookup::new(Collection::Users, "owner", "_id", "ownerDetails")
        .with_pipeline(owner_summary(&["username", "avatar"])),
    )
    .lookup(Lookup::new(Collection::Likes, "_id", "tweet", "likes"))
    .lookup(Lookup::new(Collection::Comments, "_id", "tweet", "comments"))
    .unwind("ownerDetails")
    .add_fields([
      ("likesCount", Expr::size("likes")),
      ("commentsCount", Expr::size("comments")),
      ("isLiked", Expr::contains("likes.likedBy", viewer_needle(viewer))),
    ])
    .project([
      ("content", Expr::Include),
      ("createdAt", Expr::Include),
      ("owner", Expr::field("ownerDetails")),
      ("likesCount", Expr::Include),
      ("commentsCount", Expr::Include),
      ("isLiked", Expr::Include),
    ])
    .newest_first()
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// Users subscribed to `channel`, most recent first.
pub fn channel_subscribers(channel: Uuid) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("channel", channel))
    .newest_first()
    .lookup(
      Lookup::new(Collection::Users, "subscriber", "_id", "subscriberInfo")
        .with_pipeline(owner_summary(&["username", "fullName", "avatar"])),
    )
    .unwind("subscriberInfo")
    .replace_root("subscriberInfo")
}

/// Channels `subscriber` follows, each with its own subscriber count.
pub fn subscribed_channels(subscriber: Uuid) -> Pipeline {
  let channel = Pipeline::new()
    .lookup(Lookup::new(Collection::Subscriptions, "_id", "channel", "subscribers"))
    .add_fields([("subscriberCount", Expr::size("subscribers"))])
    .project([
      ("username", Expr::Include),
      ("fullName", Expr::Include),
      ("avatar", Expr::Include),
      ("subscriberCount", Expr::Include),
    ]);

  Pipeline::new()
    .matching(Filter::eq_id("subscriber", subscriber))
    .newest_first()
    .lookup(
      Lookup::new(Collection::Users, "channel", "_id", "channelInfo")
        .with_pipeline(channel),
    )
    .unwind("channelInfo")
    .replace_root("channelInfo")
}

// ─── Playlists ───────────────────────────────────────────────────────────────

/// Playlists of `owner` with video totals and a cover thumbnail.
pub fn user_playlists(owner: Uuid) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("owner", owner))
    .lookup(
      Lookup::new(Collection::Videos, "videos", "_id", "videosDetails")
        .with_pipeline(owner_summary(&["thumbnail", "title", "duration", "views"])),
    )
    .add_fields([
      ("totalVideos", Expr::size("videosDetails")),
      ("totalViews", Expr::sum("videosDetails.views")),
    ])
    .project([
      ("name", Expr::Include),
      ("description", Expr::Include),
      ("createdAt", Expr::Include),
      ("totalVideos", Expr::Include),
      ("totalViews", Expr::Include),
      ("playlistThumbnail", Expr::first("videosDetails.thumbnail")),
    ])
    .newest_first()
}

fn owner_ref(prefix: &str) -> Expr {
  Expr::object([
    ("_id", Expr::field(format!("{prefix}._id"))),
    ("username", Expr::field(format!("{prefix}.username"))),
    ("avatar", Expr::field(format!("{prefix}.avatar"))),
  ])
}

/// One playlist with its videos and their owners. Yields nothing when the
/// playlist owner no longer exists.
pub fn playlist_detail(playlist: Uuid) -> Pipeline {
  let video = Pipeline::new()
    .lookup(Lookup::new(Collection::Users, "owner", "_id", "ownerDetails"))
    .unwind("ownerDetails")
    .project([
      ("videoFile", Expr::Include),
      ("thumbnail", Expr::Include),
      ("title", Expr::Include),
      ("duration", Expr::Include),
      ("views", Expr::Include),
      ("createdAt", Expr::Include),
      ("owner", owner_ref("ownerDetails")),
    ]);

  Pipeline::new()
    .matching(Filter::id(playlist))
    .lookup(Lookup::new(Collection::Videos, "videos", "_id", "videos").with_pipeline(video))
    .lookup(Lookup::new(Collection::Users, "owner", "_id", "ownerDetails"))
    .unwind("ownerDetails")
    .project([
      ("name", Expr::Include),
      ("description", Expr::Include),
      ("createdAt", Expr::Include),
      ("videos", Expr::Include),
      ("owner", owner_ref("ownerDetails")),
    ])
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// Totals shown on a creator's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
  pub total_subscribers: u64,
  pub total_videos:      u64,
  pub total_views:       u64,
  pub total_likes:       u64,
}

/// Subscriber count of `channel` (over `subscriptions`).
pub fn channel_subscriber_count(channel: Uuid) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("channel", channel))
    .count("subscriberCount")
}

/// Video, view and like totals of `owner` (over `videos`).
pub fn channel_video_totals(owner: Uuid) -> Pipeline {
  Pipeline::new()
    .matching(Filter::eq_id("owner", owner))
    .lookup(Lookup::new(Collection::Likes, "_id", "video", "likes"))
    .group([
      ("totalVideos", Accumulator::Count),
      ("totalViews", Accumulator::Sum(Expr::field("views"))),
      ("totalLikes", Accumulator::Sum(Expr::size("likes"))),
    ])
}

/// Assemble [`ChannelStats`]; a channel with no videos or subscribers
/// reports zeros.
pub async fn channel_stats<S: DocumentStore>(
  store: &S,
  channel: Uuid,
) -> Result<ChannelStats, S::Error> {
  let subscribers = channel_subscriber_count(channel);
  let videos = channel_video_totals(channel);
  let subs = store.aggregate(Collection::Subscriptions, &subscribers).await?;
  let totals = store.aggregate(Collection::Videos, &videos).await?;

  let number = |docs: &[Value], key: &str| {
    docs
      .first()
      .and_then(|d| d.get(key))
      .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
      .unwrap_or(0)
  };

  Ok(ChannelStats {
    total_subscribers: number(&subs, "subscriberCount"),
    total_videos:      number(&totals, "totalVideos"),
    total_views:       number(&totals, "totalViews"),
    total_likes:       number(&totals, "totalLikes"),
  })
}
