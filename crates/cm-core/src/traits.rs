//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Comment, CommentNode, Community, Notification, Page, Post, PostFilter, SearchResults, User,
    Vote, VoteAction,
};
use crate::validate::RuleList;

/// Data persistence contract for communities, posts, comments, votes and
/// moderation state.
///
/// `viewer` parameters scope the vote projection on returned entities to the
/// requesting user; `None` yields empty projections.
#[async_trait]
pub trait ForumRepo: Send + Sync {
    // User Operations
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn ban_user(&self, user_id: Uuid, until: DateTime<Utc>) -> anyhow::Result<()>;

    // Community Operations
    async fn create_community(&self, community: Community) -> anyhow::Result<()>;
    async fn get_community(&self, name: &str) -> anyhow::Result<Option<Community>>;
    async fn find_communities(&self, fragment: &str, limit: i64) -> anyhow::Result<Vec<Community>>;
    async fn update_community_profile(
        &self,
        id: Uuid,
        description: Option<String>,
        image_url: Option<String>,
        logo_url: Option<String>,
    ) -> anyhow::Result<()>;
    async fn update_community_rules(&self, id: Uuid, rules: RuleList) -> anyhow::Result<()>;
    async fn add_moderator(&self, community_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
    async fn remove_moderator(&self, community_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
    async fn transfer_owner(&self, community_id: Uuid, new_owner: Uuid) -> anyhow::Result<()>;

    // Post Operations
    async fn create_post(&self, post: Post) -> anyhow::Result<()>;
    async fn get_post(&self, id: Uuid, viewer: Option<Uuid>) -> anyhow::Result<Option<Post>>;
    async fn list_posts(
        &self,
        filter: &PostFilter,
        viewer: Option<Uuid>,
    ) -> anyhow::Result<Page<Post>>;
    async fn update_post(&self, id: Uuid, title: String, content: String) -> anyhow::Result<()>;
    async fn set_post_deleted(&self, id: Uuid, deleted: bool) -> anyhow::Result<()>;
    /// Physically removes the post, its comments, and every vote on any of
    /// them.
    async fn nuke_post(&self, id: Uuid) -> anyhow::Result<()>;

    // Comment Operations
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    async fn get_comment(&self, id: Uuid, viewer: Option<Uuid>)
        -> anyhow::Result<Option<Comment>>;
    /// A cursor page of nodes under `root` (top-level when `None`), each
    /// carrying up to three nested reply levels.
    async fn list_comments(
        &self,
        post_id: Uuid,
        root: Option<Uuid>,
        count: i64,
        cursor: Option<Uuid>,
        viewer: Option<Uuid>,
    ) -> anyhow::Result<Page<CommentNode>>;
    async fn update_comment(&self, id: Uuid, content: String) -> anyhow::Result<()>;
    async fn set_comment_deleted(&self, id: Uuid, deleted: bool) -> anyhow::Result<()>;
    /// Physically removes the comment subtree and its votes.
    async fn nuke_comment(&self, id: Uuid) -> anyhow::Result<()>;

    // Vote Operations
    /// Idempotent toggle; returns the vote record on `like`, `None` on
    /// `unlike`. Denormalized counts move only when state actually changes.
    async fn set_post_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        action: VoteAction,
    ) -> anyhow::Result<Option<Vote>>;
    async fn set_comment_vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        action: VoteAction,
    ) -> anyhow::Result<Option<Vote>>;

    // Search Operations
    async fn search(&self, query: &str) -> anyhow::Result<SearchResults>;

    // Notification Operations
    async fn push_notification(&self, notification: Notification) -> anyhow::Result<()>;
    async fn list_notifications(
        &self,
        user_id: Uuid,
        count: i64,
        cursor: Option<Uuid>,
    ) -> anyhow::Result<Page<Notification>>;
}

/// Session identity contract.
///
/// Deliberately narrow: resolving an opaque token to a user id is all the
/// API layer needs; account provisioning lives with an external identity
/// provider.
pub trait AuthProvider: Send + Sync {
    /// Signs a session token for the given user.
    fn issue_token(&self, user_id: Uuid) -> String;

    /// Verifies a token and returns the user it names, if the signature
    /// holds.
    fn resolve_token(&self, token: &str) -> Option<Uuid>;
}
