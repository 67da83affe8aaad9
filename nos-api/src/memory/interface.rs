//! Memory management interface

use crate::core::types::{PageNum, Size};
use crate::error::Result;

/// Trait for a physical page allocator.
///
/// A buddy instance implements this trait so higher layers (kernel heap,
/// page-table materialisation) can depend on the abstraction rather than on
/// a concrete allocator.
pub trait PageAllocator {
    /// Allocates a single page. Equivalent to `alloc_pages(1)`.
    fn alloc_page(&mut self) -> Result<PageNum>;

    /// Allocates `count` contiguous pages, rounded up to the next power of
    /// two internally, and returns the index of the first page.
    fn alloc_pages(&mut self, count: PageNum) -> Result<PageNum>;

    /// Frees a single page previously returned by [`Self::alloc_page`].
    fn free_page(&mut self, page: PageNum) -> Result<()>;

    /// Frees `count` contiguous pages previously returned as one block by
    /// [`Self::alloc_pages`].
    fn free_pages(&mut self, start: PageNum, count: PageNum) -> Result<()>;

    /// Returns the number of currently free pages (buddy free lists only,
    /// excluding the page cache).
    fn free_pages_count(&self) -> PageNum;

    /// Returns the total number of pages managed by this instance.
    fn total_pages(&self) -> PageNum;

    /// Returns the page size in bytes.
    fn page_size(&self) -> Size;
}
