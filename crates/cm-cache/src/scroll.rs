//! Per-path scroll offsets, restored on back-navigation.

use dashmap::DashMap;

/// Client-only persisted state: the scroll position for every path the
/// session has navigated.
#[derive(Debug, Default)]
pub struct ScrollPositions {
    by_path: DashMap<String, f64>,
}

impl ScrollPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, path: impl Into<String>, offset: f64) {
        self.by_path.insert(path.into(), offset);
    }

    /// The stored offset, left in place for repeated back-navigation.
    pub fn restore(&self, path: &str) -> Option<f64> {
        self.by_path.get(path).map(|o| *o)
    }

    pub fn forget(&self, path: &str) {
        self.by_path.remove(path);
    }
}
