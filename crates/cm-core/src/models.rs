//! # Domain Models
//!
//! These structs represent the core entities of commune.
//! We use UUID v7 for time-ordered, globally unique identification; the id
//! doubles as the "newest-first" sort key and as the pagination cursor.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::RuleList;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    /// A ban is a time window, not a permanent flag.
    pub banned_until: Option<DateTime<Utc>>,
    pub is_global_moderator: bool,
    pub created_at: DateTime<Utc>,
}

/// A named, user-created forum scoping Posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: Uuid,
    /// Immutable after creation. 2..=24 chars of `[a-z0-9_]`.
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub logo_url: Option<String>,
    /// Flat (title, content) pair sequence; length is always even.
    pub rules: RuleList,
    pub owner_id: Uuid,
    pub moderators: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A titled submission inside exactly one Community.
///
/// `vote_count` / `comment_count` are denormalized summaries maintained by
/// the repository; `votes` is the *viewer's* vote projection and holds zero
/// or one entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub community_id: Uuid,
    pub community_name: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-deleted posts stay resolvable by id but are excluded from listings.
    pub is_deleted: bool,
    pub vote_count: i64,
    pub comment_count: i64,
    pub votes: Vec<Vote>,
}

/// A reply to a Post or to another Comment; `parent_id == None` marks a root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub vote_count: i64,
    pub reply_count: i64,
    pub votes: Vec<Vote>,
}

/// A comment with its eagerly loaded replies. The read path materializes
/// four levels (root + 3); deeper levels are fetched lazily with the
/// depth-4 comment as the listing root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// A binary per-user endorsement. (user, target) is the identity; presence
/// is the only state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Reply activity addressed to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub post_id: Uuid,
    pub comment_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone commented on your post.
    PostReply,
    /// Someone replied under your comment.
    CommentReply,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PostReply => "post_reply",
            NotificationKind::CommentReply => "comment_reply",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_reply" => Ok(NotificationKind::PostReply),
            "comment_reply" => Ok(NotificationKind::CommentReply),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Listing sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    /// Newest-first by creation time.
    New,
    /// Most-voted first, bounded by a [`TimeWindow`].
    Hot,
    /// Most-discussed first (comment count).
    Moot,
}

/// Creation-time window for the `hot` sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    #[serde(rename = "all time")]
    AllTime,
}

impl TimeWindow {
    /// Lower bound on `created_at`, or `None` for all-time.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::Day => Some(now - Duration::days(1)),
            TimeWindow::Week => Some(now - Duration::weeks(1)),
            TimeWindow::Month => Some(now - Duration::days(30)),
            TimeWindow::Year => Some(now - Duration::days(365)),
            TimeWindow::AllTime => None,
        }
    }
}

/// Ban window options offered to moderators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanDuration {
    #[serde(rename = "1 Hour")]
    Hour,
    #[serde(rename = "1 Day")]
    Day,
    #[serde(rename = "1 Week")]
    Week,
    #[serde(rename = "1 Month")]
    Month,
    #[serde(rename = "1 Year")]
    Year,
}

impl BanDuration {
    pub fn until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BanDuration::Hour => now + Duration::hours(1),
            BanDuration::Day => now + Duration::days(1),
            BanDuration::Week => now + Duration::weeks(1),
            BanDuration::Month => now + Duration::days(30),
            BanDuration::Year => now + Duration::days(365),
        }
    }
}

/// A vote toggle as requested by the client. The direction is derived by the
/// caller from the copy it is rendering; the backend applies it idempotently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Like,
    Unlike,
}

/// Filter for a post listing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilter {
    /// `None` means every community.
    pub community: Option<String>,
    pub sort: PostSort,
    pub window: TimeWindow,
    /// Page size, 4..=50.
    pub count: i64,
    pub cursor: Option<Uuid>,
}

/// One cursor page. `next_cursor` is the last item's id and is present iff
/// the page came back full; a short page ends the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

impl<T> Page<T> {
    /// Builds a page from a fetched batch, deriving `next_cursor` from the
    /// requested size.
    pub fn from_batch(items: Vec<T>, count: usize, id_of: impl Fn(&T) -> Uuid) -> Self {
        let next_cursor = if items.len() == count {
            items.last().map(&id_of)
        } else {
            None
        };
        Page { items, next_cursor }
    }

    pub fn empty() -> Self {
        Page { items: Vec::new(), next_cursor: None }
    }
}

/// Cross-entity search result, with `u/` / `b/` prefix disambiguation
/// applied by the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub users: Vec<User>,
    pub communities: Vec<Community>,
    pub posts: Vec<Post>,
}
