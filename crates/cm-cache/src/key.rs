//! # Cache keys
//!
//! Listings are cached under a structurally comparable request descriptor,
//! and "which cached views does this mutation affect" is an explicit
//! predicate on the key rather than filtering logic duplicated at call
//! sites.

use cm_core::{Post, PostFilter, PostSort, TimeWindow};
use uuid::Uuid;

/// Descriptor of one post listing. Changing the sort key or time window
/// produces a different key, which restarts pagination from the first page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    /// `None` scopes to every community.
    pub community: Option<String>,
    pub sort: PostSort,
    pub window: TimeWindow,
    pub count: i64,
}

impl ListingKey {
    pub fn from_filter(filter: &PostFilter) -> Self {
        ListingKey {
            community: filter.community.clone(),
            sort: filter.sort,
            window: filter.window,
            count: filter.count,
        }
    }

    /// Whether this listing's filter could contain the post. A `None`
    /// community admits everything; a scoped listing admits only its own
    /// community. Sort and window deliberately do not participate — a vote
    /// can move a post into or out of `hot` and the stale entry is accepted
    /// until the next refetch.
    pub fn admits(&self, post: &Post) -> bool {
        match &self.community {
            None => true,
            Some(name) => *name == post.community_name,
        }
    }
}

/// Descriptor of one comment listing: a page sequence of nodes under `root`
/// (top-level when `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommentsKey {
    pub post_id: Uuid,
    pub root: Option<Uuid>,
    pub count: i64,
}
