//! Proximity-based page cache for rendered pages
//!
//! Retention is distance-based rather than LRU: navigation is typically
//! sequential, so neighbors of the current page are far more likely to be
//! revisited than a page visited once five steps ago.

use std::collections::HashMap;

use log::debug;

use super::types::{PageEntry, TextSpan};

/// Bounded store of rendered page entries keyed by page number.
///
/// Owned by a single viewer; all mutation goes through these operations.
pub struct PageCache {
    capacity: usize,
    entries: HashMap<u32, PageEntry>,
}

impl PageCache {
    /// Create a new cache with the given capacity (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Get a cached entry
    #[must_use]
    pub fn get(&self, page: u32) -> Option<&PageEntry> {
        self.entries.get(&page)
    }

    /// Check if a page is present, regardless of the scale it was rendered at
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.entries.contains_key(&page)
    }

    /// Check if a page is cached at the given scale.
    ///
    /// Entries rendered at a different scale stay cached but are stale;
    /// they are re-rendered in place rather than removed.
    #[must_use]
    pub fn is_fresh(&self, page: u32, scale: f32) -> bool {
        self.entries
            .get(&page)
            .is_some_and(|e| e.matches_scale(scale))
    }

    /// Insert or replace a page entry.
    ///
    /// Replacing an entry drops its text spans along with the old raster;
    /// callers re-extract lazily for the fresh entry.
    pub fn put(&mut self, page: u32, entry: PageEntry) {
        self.entries.insert(page, entry);
    }

    /// Attach text spans to a cached entry.
    ///
    /// Spans are set at most once per entry: a second call for the same
    /// cached entry is a no-op. Returns whether the spans were stored.
    pub fn set_text_spans(&mut self, page: u32, spans: Vec<TextSpan>) -> bool {
        match self.entries.get_mut(&page) {
            Some(entry) if entry.text_spans.is_none() => {
                entry.text_spans = Some(spans);
                true
            }
            _ => false,
        }
    }

    /// Evict entries farthest from the current page until within capacity.
    ///
    /// Retains the `capacity` pages with smallest `|page - current|`, ties
    /// broken toward the lower page number. The current page is never
    /// evicted, even transiently. Raster and text spans go together.
    pub fn evict(&mut self, current: u32) {
        if self.entries.len() <= self.capacity {
            return;
        }

        let mut pages: Vec<u32> = self.entries.keys().copied().collect();
        pages.sort_by_key(|&p| (p.abs_diff(current), p));

        for page in pages.into_iter().skip(self.capacity) {
            debug_assert_ne!(page, current, "display page selected for eviction");
            self.entries.remove(&page);
            debug!("evicted page {page} (current: {current})");
        }
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached page numbers in ascending order
    #[must_use]
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.entries.keys().copied().collect();
        pages.sort_unstable();
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::coords::DocRect;
    use crate::viewer::types::RasterData;

    fn entry(page: u32) -> PageEntry {
        entry_at_scale(page, 1.0)
    }

    fn entry_at_scale(page: u32, scale: f32) -> PageEntry {
        PageEntry::new(
            page,
            RasterData {
                pixels: vec![0; 300],
                width_px: 10,
                height_px: 10,
            },
            scale,
        )
    }

    #[test]
    fn insert_and_get() {
        let mut cache = PageCache::new(5);
        cache.put(3, entry(3));

        assert!(cache.contains(3));
        assert_eq!(cache.get(3).map(|e| e.page), Some(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evict_keeps_nearest_to_current() {
        let mut cache = PageCache::new(5);
        for page in 1..=8 {
            cache.put(page, entry(page));
        }

        cache.evict(5);

        assert_eq!(cache.pages(), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn evict_ties_prefer_lower_page() {
        let mut cache = PageCache::new(4);
        // Pages 4 and 6 (distance 1) always survive alongside 5; the last
        // slot is a distance-2 tie between 3 and 7, and 3 wins it.
        for page in [3, 4, 5, 6, 7] {
            cache.put(page, entry(page));
        }

        cache.evict(5);

        assert_eq!(cache.pages(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn evict_never_removes_current_page() {
        let mut cache = PageCache::new(1);
        for page in 1..=4 {
            cache.put(page, entry(page));
        }

        cache.evict(4);

        assert_eq!(cache.pages(), vec![4]);
    }

    #[test]
    fn evict_within_capacity_is_noop() {
        let mut cache = PageCache::new(5);
        for page in 1..=5 {
            cache.put(page, entry(page));
        }

        cache.evict(1);

        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn navigate_far_then_evict_retargets_retained_set() {
        let mut cache = PageCache::new(5);
        // At page 5 with all of 3..=7 rendered.
        for page in [3, 4, 5, 6, 7] {
            cache.put(page, entry(page));
        }

        // Navigate to page 1, whose render lands in cache.
        cache.put(1, entry(1));
        cache.evict(1);

        // Retained: the 5 nearest to 1 among cached {1,3,4,5,6,7}.
        assert_eq!(cache.pages(), vec![1, 3, 4, 5, 6]);
    }

    #[test]
    fn scale_change_leaves_entry_cached_but_stale() {
        let mut cache = PageCache::new(5);
        cache.put(2, entry_at_scale(2, 1.0));

        assert!(cache.is_fresh(2, 1.0));
        assert!(!cache.is_fresh(2, 1.5));
        assert!(cache.contains(2));
    }

    #[test]
    fn text_spans_set_once() {
        let mut cache = PageCache::new(5);
        cache.put(1, entry(1));

        let spans = vec![TextSpan {
            bounds: DocRect::new(0.0, 0.0, 10.0, 2.0),
            text: "hello".to_string(),
        }];
        assert!(cache.set_text_spans(1, spans));
        assert!(!cache.set_text_spans(1, vec![]));
        assert_eq!(
            cache.get(1).and_then(|e| e.text_spans.as_ref()).map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn replacing_entry_drops_stale_spans() {
        let mut cache = PageCache::new(5);
        cache.put(1, entry_at_scale(1, 1.0));
        cache.set_text_spans(1, vec![]);

        cache.put(1, entry_at_scale(1, 2.0));

        assert!(cache.get(1).is_some_and(|e| e.text_spans.is_none()));
    }

    #[test]
    fn eviction_drops_raster_and_spans_together() {
        let mut cache = PageCache::new(1);
        cache.put(1, entry(1));
        cache.set_text_spans(1, vec![]);
        cache.put(9, entry(9));

        cache.evict(9);

        assert!(!cache.contains(1));
        assert_eq!(cache.pages(), vec![9]);
    }
}
