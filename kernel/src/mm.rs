//! Kernel-owned physical page allocator.
//!
//! The concurrency model requires the buddy allocator to be protected by
//! exactly one [`MutexIrq`]; [`PageAllocator`] is that wrapper. Every
//! mutating method locks for the duration of the call and releases before
//! returning, including on an error path.

use nos_api::{PageNum, Result, Size};
use nos_memory_management::BuddyAllocator;

use crate::sync::MutexIrq;

/// The buddy allocator, held behind the kernel's single page-allocator
/// lock.
pub struct PageAllocator {
    inner: MutexIrq<BuddyAllocator>,
}

impl PageAllocator {
    /// An allocator with no backing region; call [`Self::init`] before use.
    pub const fn new() -> Self {
        Self { inner: MutexIrq::new(BuddyAllocator::new()) }
    }

    pub fn init(&self, name: &str, max_order: u8, page_count: usize) -> Result<()> {
        self.inner.lock().init(name, max_order, page_count)
    }

    pub fn alloc(&self, order: u8) -> Result<usize> {
        self.inner.lock().alloc(order)
    }

    pub fn free(&self, idx: usize) -> Result<()> {
        self.inner.lock().free(idx)
    }

    pub fn cached_alloc(&self) -> Result<usize> {
        self.inner.lock().cached_alloc()
    }

    pub fn cached_free(&self, idx: usize) -> Result<()> {
        self.inner.lock().cached_free(idx)
    }

    pub fn free_space(&self) -> usize {
        self.inner.lock().free_space()
    }

    pub fn cached_space(&self) -> usize {
        self.inner.lock().cached_space()
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl nos_api::PageAllocator for PageAllocator {
    fn alloc_page(&mut self) -> Result<PageNum> {
        self.inner.lock().alloc_page()
    }

    fn alloc_pages(&mut self, count: PageNum) -> Result<PageNum> {
        self.inner.lock().alloc_pages(count)
    }

    fn free_page(&mut self, page: PageNum) -> Result<()> {
        self.inner.lock().free_page(page)
    }

    fn free_pages(&mut self, start: PageNum, count: PageNum) -> Result<()> {
        self.inner.lock().free_pages(start, count)
    }

    fn free_pages_count(&self) -> PageNum {
        self.inner.lock().free_pages_count()
    }

    fn total_pages(&self) -> PageNum {
        self.inner.lock().total_pages()
    }

    fn page_size(&self) -> Size {
        self.inner.lock().page_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_allocator_round_trips_and_releases_the_lock() {
        let a = PageAllocator::new();
        a.init("locked", 4, 8).unwrap();

        let p = a.alloc(0).unwrap();
        assert!(!a.inner.is_locked());

        a.free(p).unwrap();
        assert!(!a.inner.is_locked());
    }
}
