//! Small direct-mapped read cache.
//!
//! Accelerates repeated reads of the same page without consulting the
//! page map's hash lookup each time. Never used for writes (a write must
//! always check CoW/attribute state through the canonical page map), and
//! must be invalidated whenever a page's identity or attributes change.

use super::page::Page;

const CACHE_WAYS: usize = 16;

#[derive(Clone)]
struct Slot {
    pageno: u64,
    page: Page,
}

/// Direct-mapped by `pageno % CACHE_WAYS`. `Page` is cheap to clone (an
/// `Arc` bump plus a couple of words), so a cache hit never touches page
/// data.
#[derive(Default, Clone)]
pub struct ReadCache {
    slots: Vec<Option<Slot>>,
}

impl ReadCache {
    pub fn new() -> Self {
        Self { slots: vec![None; CACHE_WAYS] }
    }

    #[inline]
    fn way(pageno: u64) -> usize {
        (pageno as usize) % CACHE_WAYS
    }

    pub fn get(&self, pageno: u64) -> Option<&Page> {
        match &self.slots[Self::way(pageno)] {
            Some(slot) if slot.pageno == pageno => Some(&slot.page),
            _ => None,
        }
    }

    pub fn insert(&mut self, pageno: u64, page: Page) {
        // Trap pages and CoW pages must never be cached: the former
        // needs its callback invoked on every access, the latter would
        // let a later in-place materialization go unnoticed by readers
        // holding a stale clone).
        if page.trap.is_some() || page.is_cow_page() {
            return;
        }
        self.slots[Self::way(pageno)] = Some(Slot { pageno, page });
    }

    /// Drop every cached entry. Must be called after any `set_page_attr`,
    /// free, or CoW materialization.
    pub fn invalidate_reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::page::PageAttr;

    #[test]
    fn hit_after_insert() {
        let mut cache = ReadCache::new();
        let page = Page::zeroed(PageAttr::READ);
        cache.insert(3, page);
        assert!(cache.get(3).is_some());
        assert!(cache.get(3 + CACHE_WAYS as u64).is_none());
    }

    #[test]
    fn invalidate_clears_all() {
        let mut cache = ReadCache::new();
        cache.insert(1, Page::zeroed(PageAttr::READ));
        cache.invalidate_reset();
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn cow_page_never_cached() {
        let mut cache = ReadCache::new();
        cache.insert(1, Page::cow_zero());
        assert!(cache.get(1).is_none());
    }
}
