//! # Paged listings
//!
//! One listing accumulates cursor pages strictly in fetch order. The next
//! page is never requested until the previous one resolves, so out-of-order
//! arrival cannot happen; a short page ends the sequence.

use cm_core::Page;
use uuid::Uuid;

/// Viewport proximity (in pixels) at which consumers ask for the next page.
pub const SCROLL_FETCH_THRESHOLD_PX: f64 = 800.0;

/// Outcome of asking a listing to start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Go fetch, using this cursor (`None` for the first page).
    Start { cursor: Option<Uuid> },
    /// A fetch for this listing is already in flight.
    InFlight,
    /// The server declared the sequence complete.
    Exhausted,
}

/// An ever-growing sequence of cursor pages for one cache key.
#[derive(Debug, Clone)]
pub struct PagedListing<T> {
    pages: Vec<Vec<T>>,
    next_cursor: Option<Uuid>,
    in_flight: bool,
    fetched_any: bool,
}

impl<T> Default for PagedListing<T> {
    fn default() -> Self {
        PagedListing {
            pages: Vec::new(),
            next_cursor: None,
            in_flight: false,
            fetched_any: false,
        }
    }
}

impl<T> PagedListing<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A next page exists until the server says otherwise.
    pub fn has_next(&self) -> bool {
        !self.fetched_any || self.next_cursor.is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Starts a fetch if none is in flight and a next page is known to
    /// exist. The caller must settle the ticket with [`complete_fetch`] or
    /// [`abort_fetch`].
    ///
    /// [`complete_fetch`]: PagedListing::complete_fetch
    /// [`abort_fetch`]: PagedListing::abort_fetch
    pub fn begin_fetch(&mut self) -> FetchDecision {
        if self.in_flight {
            return FetchDecision::InFlight;
        }
        if !self.has_next() {
            return FetchDecision::Exhausted;
        }
        self.in_flight = true;
        FetchDecision::Start { cursor: self.next_cursor }
    }

    /// Appends a resolved page in fetch order.
    pub fn complete_fetch(&mut self, page: Page<T>) {
        self.in_flight = false;
        self.fetched_any = true;
        self.next_cursor = page.next_cursor;
        self.pages.push(page.items);
    }

    /// Releases the in-flight guard without recording a page (failed or
    /// abandoned request).
    pub fn abort_fetch(&mut self) {
        self.in_flight = false;
    }

    /// Whether a consumer nearing the end of rendered content should request
    /// more.
    pub fn should_fetch(&self, distance_to_end_px: f64) -> bool {
        distance_to_end_px <= SCROLL_FETCH_THRESHOLD_PX && !self.in_flight && self.has_next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flatten()
    }

    /// In-place rewrite of every cached item (optimistic patching).
    pub fn patch_items(&mut self, mut patch: impl FnMut(&mut T)) {
        for page in &mut self.pages {
            for item in page.iter_mut() {
                patch(item);
            }
        }
    }

    /// Page-granular rewrite, for caches whose pages hold tree roots.
    pub fn patch_pages(&mut self, mut patch: impl FnMut(&mut Vec<T>)) {
        for page in &mut self.pages {
            patch(page);
        }
    }
}

impl<T: Clone> PagedListing<T> {
    /// The flattened sequence, in fetch order. Idempotent: flattening never
    /// reorders items across page boundaries.
    pub fn flatten(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[Uuid], next: Option<Uuid>) -> Page<Uuid> {
        Page { items: ids.to_vec(), next_cursor: next }
    }

    #[test]
    fn test_pages_append_in_fetch_order() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::now_v7()).collect();
        let mut listing = PagedListing::new();

        assert_eq!(listing.begin_fetch(), FetchDecision::Start { cursor: None });
        listing.complete_fetch(page(&ids[..2], Some(ids[1])));

        assert_eq!(listing.begin_fetch(), FetchDecision::Start { cursor: Some(ids[1]) });
        listing.complete_fetch(page(&ids[2..4], Some(ids[3])));

        assert_eq!(listing.flatten(), ids[..4].to_vec());
        // Flattening twice yields the same sequence.
        assert_eq!(listing.flatten(), ids[..4].to_vec());
    }

    #[test]
    fn test_no_concurrent_fetch_for_same_listing() {
        let mut listing: PagedListing<Uuid> = PagedListing::new();
        assert!(matches!(listing.begin_fetch(), FetchDecision::Start { .. }));
        assert_eq!(listing.begin_fetch(), FetchDecision::InFlight);

        listing.abort_fetch();
        assert!(matches!(listing.begin_fetch(), FetchDecision::Start { .. }));
    }

    #[test]
    fn test_short_page_ends_the_sequence() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::now_v7()).collect();
        let mut listing = PagedListing::new();

        listing.begin_fetch();
        listing.complete_fetch(page(&ids, None));

        assert!(!listing.has_next());
        assert_eq!(listing.begin_fetch(), FetchDecision::Exhausted);
    }

    #[test]
    fn test_should_fetch_respects_threshold_and_state() {
        let mut listing: PagedListing<Uuid> = PagedListing::new();
        assert!(listing.should_fetch(100.0));
        assert!(!listing.should_fetch(SCROLL_FETCH_THRESHOLD_PX + 1.0));

        listing.begin_fetch();
        assert!(!listing.should_fetch(100.0)); // in flight

        listing.complete_fetch(Page { items: vec![Uuid::now_v7()], next_cursor: None });
        assert!(!listing.should_fetch(100.0)); // exhausted
    }
}
