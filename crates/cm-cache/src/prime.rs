//! # Navigation snapshot priming
//!
//! When navigating from a listing into a detail page, a serialized snapshot
//! of the already-known partial entity travels with the navigation. It is
//! parsed and shape-validated here; a snapshot that fails validation is
//! discarded silently and the normal fetch proceeds. The snapshot is only
//! ever placeholder content — the authoritative fetch is always issued and
//! always wins (stale-while-revalidate, not cache-instead-of-fetch).

use serde::de::DeserializeOwned;
use tracing::debug;

/// Parses auxiliary navigation state into the expected shape, or discards
/// it.
pub fn parse_snapshot<T: DeserializeOwned>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(%err, "discarding malformed navigation snapshot");
            None
        }
    }
}
