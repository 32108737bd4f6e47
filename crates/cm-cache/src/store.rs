//! # QueryCache
//!
//! The process-wide keyed store behind every listing and detail view.
//! Optimistic vote patches are applied synchronously to the detail slot and
//! to every cached listing whose key admits the target, ahead of backend
//! confirmation. Writes to multiple keys carry no atomicity across them,
//! and a failed backend mutation is not rolled back; consumers reconcile by
//! refetching.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use cm_core::{
    Comment, CommentNode, Community, Notification, Page, Post, Vote, VoteAction,
};

use crate::key::{CommentsKey, ListingKey};
use crate::pages::{FetchDecision, PagedListing};
use crate::tree::{patch_tree, share, SharedNode};

/// Keeps at most one outstanding vote mutation per target. Dropping the
/// guard re-enables the control.
pub struct VoteGuard<'a> {
    inflight: &'a DashMap<Uuid, ()>,
    target: Uuid,
}

impl Drop for VoteGuard<'_> {
    fn drop(&mut self) {
        self.inflight.remove(&self.target);
    }
}

#[derive(Default)]
pub struct QueryCache {
    posts: DashMap<ListingKey, PagedListing<Post>>,
    post_detail: DashMap<Uuid, Post>,
    community_detail: DashMap<String, Community>,
    comments: DashMap<CommentsKey, PagedListing<Arc<SharedNode>>>,
    notifications: DashMap<Uuid, PagedListing<Notification>>,
    vote_inflight: DashMap<Uuid, ()>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Post listings ────────────────────────────────────────────────────

    pub fn begin_posts_fetch(&self, key: &ListingKey) -> FetchDecision {
        self.posts.entry(key.clone()).or_default().begin_fetch()
    }

    pub fn complete_posts_fetch(&self, key: &ListingKey, page: Page<Post>) {
        self.posts.entry(key.clone()).or_default().complete_fetch(page);
    }

    pub fn abort_posts_fetch(&self, key: &ListingKey) {
        if let Some(mut listing) = self.posts.get_mut(key) {
            listing.abort_fetch();
        }
    }

    /// Flattened snapshot of one listing, in fetch order.
    pub fn posts(&self, key: &ListingKey) -> Vec<Post> {
        self.posts.get(key).map(|l| l.flatten()).unwrap_or_default()
    }

    pub fn posts_should_fetch(&self, key: &ListingKey, distance_to_end_px: f64) -> bool {
        self.posts
            .get(key)
            .map(|l| l.should_fetch(distance_to_end_px))
            .unwrap_or(distance_to_end_px <= crate::pages::SCROLL_FETCH_THRESHOLD_PX)
    }

    // ── Detail slots (stale-while-revalidate) ────────────────────────────

    /// Authoritative write from a resolved fetch.
    pub fn put_post(&self, post: Post) {
        self.post_detail.insert(post.id, post);
    }

    /// Placeholder write from a navigation snapshot; never displaces an
    /// existing entry. Returns whether the snapshot was taken.
    pub fn prime_post(&self, post: Post) -> bool {
        match self.post_detail.entry(post.id) {
            dashmap::Entry::Occupied(_) => false,
            dashmap::Entry::Vacant(slot) => {
                slot.insert(post);
                true
            }
        }
    }

    pub fn post(&self, id: Uuid) -> Option<Post> {
        self.post_detail.get(&id).map(|p| p.clone())
    }

    pub fn put_community(&self, community: Community) {
        self.community_detail.insert(community.name.clone(), community);
    }

    pub fn prime_community(&self, community: Community) -> bool {
        match self.community_detail.entry(community.name.clone()) {
            dashmap::Entry::Occupied(_) => false,
            dashmap::Entry::Vacant(slot) => {
                slot.insert(community);
                true
            }
        }
    }

    pub fn community(&self, name: &str) -> Option<Community> {
        self.community_detail.get(name).map(|c| c.clone())
    }

    // ── Comment listings ─────────────────────────────────────────────────

    pub fn begin_comments_fetch(&self, key: &CommentsKey) -> FetchDecision {
        self.comments.entry(*key).or_default().begin_fetch()
    }

    pub fn complete_comments_fetch(&self, key: &CommentsKey, page: Page<CommentNode>) {
        let shared = Page { items: share(page.items), next_cursor: page.next_cursor };
        self.comments.entry(*key).or_default().complete_fetch(shared);
    }

    pub fn abort_comments_fetch(&self, key: &CommentsKey) {
        if let Some(mut listing) = self.comments.get_mut(key) {
            listing.abort_fetch();
        }
    }

    pub fn comment_roots(&self, key: &CommentsKey) -> Vec<Arc<SharedNode>> {
        self.comments.get(key).map(|l| l.flatten()).unwrap_or_default()
    }

    /// Newly created comments are not spliced into cached trees; the whole
    /// comment cache for the post is dropped and refetched.
    pub fn invalidate_comments(&self, post_id: Uuid) {
        self.comments.retain(|key, _| key.post_id != post_id);
    }

    // ── Notification listings ────────────────────────────────────────────

    pub fn begin_notifications_fetch(&self, user_id: Uuid) -> FetchDecision {
        self.notifications.entry(user_id).or_default().begin_fetch()
    }

    pub fn complete_notifications_fetch(&self, user_id: Uuid, page: Page<Notification>) {
        self.notifications.entry(user_id).or_default().complete_fetch(page);
    }

    pub fn notifications(&self, user_id: Uuid) -> Vec<Notification> {
        self.notifications.get(&user_id).map(|l| l.flatten()).unwrap_or_default()
    }

    // ── Optimistic vote patches ──────────────────────────────────────────

    /// Claims the single in-flight slot for a vote on `target`; `None`
    /// while a previous vote mutation for the same target is outstanding.
    pub fn begin_vote(&self, target: Uuid) -> Option<VoteGuard<'_>> {
        if self.vote_inflight.insert(target, ()).is_some() {
            return None;
        }
        Some(VoteGuard { inflight: &self.vote_inflight, target })
    }

    /// Rewrites every cached copy of the post: the detail slot, and each
    /// listing whose key admits the post's community. The count moves by
    /// exactly ±1 per call and is not clamped; the in-flight guard is what
    /// keeps a toggle from applying twice.
    pub fn apply_post_vote(&self, post_id: Uuid, viewer: Uuid, action: VoteAction) {
        let Some(target) = self.find_post(post_id) else {
            return;
        };

        if let Some(mut post) = self.post_detail.get_mut(&post_id) {
            patch_post_vote(&mut post, viewer, action);
        }

        for mut entry in self.posts.iter_mut() {
            if !entry.key().admits(&target) {
                continue;
            }
            entry.value_mut().patch_items(|post| {
                if post.id == post_id {
                    patch_post_vote(post, viewer, action);
                }
            });
        }
    }

    /// Rewrites the comment inside every cached tree that contains it,
    /// reconstructing the root-to-target path and sharing everything else.
    pub fn apply_comment_vote(&self, comment_id: Uuid, viewer: Uuid, action: VoteAction) {
        let patch = |comment: &Comment| {
            let mut comment = comment.clone();
            patch_comment_vote(&mut comment, viewer, action);
            comment
        };
        for mut entry in self.comments.iter_mut() {
            entry.value_mut().patch_pages(|roots| {
                if let Some(rebuilt) = patch_tree(roots, comment_id, &patch) {
                    *roots = rebuilt;
                }
            });
        }
    }

    /// Best-effort lookup across the detail slot and all listings.
    fn find_post(&self, post_id: Uuid) -> Option<Post> {
        if let Some(post) = self.post_detail.get(&post_id) {
            return Some(post.clone());
        }
        self.posts
            .iter()
            .find_map(|entry| entry.value().iter().find(|p| p.id == post_id).cloned())
    }
}

fn patch_post_vote(post: &mut Post, viewer: Uuid, action: VoteAction) {
    match action {
        VoteAction::Like => {
            post.votes =
                vec![Vote { user_id: viewer, target_id: post.id, created_at: Utc::now() }];
            post.vote_count += 1;
        }
        VoteAction::Unlike => {
            post.votes = Vec::new();
            post.vote_count -= 1;
        }
    }
}

fn patch_comment_vote(comment: &mut Comment, viewer: Uuid, action: VoteAction) {
    match action {
        VoteAction::Like => {
            comment.votes =
                vec![Vote { user_id: viewer, target_id: comment.id, created_at: Utc::now() }];
            comment.vote_count += 1;
        }
        VoteAction::Unlike => {
            comment.votes = Vec::new();
            comment.vote_count -= 1;
        }
    }
}
