//! # cm-cache
//!
//! The client-side query cache: cursor-paginated listings, optimistic vote
//! patches layered over them, and the structurally shared comment-tree
//! rewrite. Nothing in here knows about rendering or HTTP; the cache is a
//! process-wide keyed store that any consumer may read and overwrite.
//!
//! Consistency is deliberately loose: multi-key patches are applied
//! best-effort with no atomicity across keys, and a failed backend mutation
//! is never rolled back — reconciliation happens on the next refetch.

pub mod debounce;
pub mod key;
pub mod pages;
pub mod prime;
pub mod scroll;
pub mod store;
pub mod tree;

pub use debounce::Debouncer;
pub use key::{CommentsKey, ListingKey};
pub use pages::{FetchDecision, PagedListing, SCROLL_FETCH_THRESHOLD_PX};
pub use prime::parse_snapshot;
pub use scroll::ScrollPositions;
pub use store::{QueryCache, VoteGuard};
pub use tree::{patch_tree, share, ComposeSlot, SharedNode};
