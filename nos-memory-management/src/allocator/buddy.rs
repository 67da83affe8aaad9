//! Buddy-system physical page allocator with a watermarked page cache.
//!
//! Free blocks are tracked by index into a flat descriptor arena rather than
//! by raw pointer: every descriptor carries `Option<usize>` prev/next links,
//! so a free-list is just a head/tail pair of indices threaded through the
//! arena. A descriptor is linked into at most one list at a time (either a
//! `free_area[order]` bucket or the page cache), which is exactly why a
//! single prev/next pair per descriptor suffices for both roles.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use nos_api::{Error, Result};

use crate::physical::PAGE_SIZE;

static_assertions::const_assert!(MAX_SUPPORTED_ORDER < usize::BITS as u8);

bitflags::bitflags! {
    /// Per-page descriptor flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFlags: u8 {
        /// The block this page belongs to is currently free.
        const FREE = 0b0000_0001;
        /// This page is the lowest-addressed page of its block. Only root
        /// pages appear on a free-list or carry a meaningful `order`.
        const ROOT = 0b0000_0010;
    }
}

/// Largest order this module will ever size an array for. A real instance's
/// `max_order` is a runtime value bounded by this constant, chosen so that
/// `1 << order` never overflows a `usize` on any supported target.
const MAX_SUPPORTED_ORDER: u8 = 48;

/// Build-time default for `max_order`, used by [`BuddyAllocator::init`]
/// whenever the caller passes `0` instead of an explicit value. `max_order`
/// here counts the number of order buckets the allocator maintains (orders
/// `0..max_order`, exclusive upper bound), so the default top-order block
/// is `1 << (DEFAULT_MAX_ORDER - 1)` pages.
pub const DEFAULT_MAX_ORDER: u8 = 14;

/// One entry of the page descriptor arena.
#[derive(Clone, Copy, Debug)]
pub struct PageDescriptor {
    flags: PageFlags,
    order: u8,
    prev: Option<usize>,
    next: Option<usize>,
}

impl PageDescriptor {
    const fn new() -> Self {
        Self {
            flags: PageFlags::empty(),
            order: 0,
            prev: None,
            next: None,
        }
    }

    /// Block order this descriptor currently carries. Only meaningful while
    /// the descriptor is [`PageFlags::ROOT`].
    pub fn order(&self) -> u8 {
        self.order
    }

    /// Whether this page is currently on a free-list or the cache.
    pub fn is_free(&self) -> bool {
        self.flags.contains(PageFlags::FREE)
    }

    /// Whether this page is the root of its block.
    pub fn is_root(&self) -> bool {
        self.flags.contains(PageFlags::ROOT)
    }
}

/// A doubly-linked list of page indices, threaded through the descriptors'
/// own prev/next fields. Used both for `free_area[order]` buckets and for
/// the page cache.
#[derive(Clone, Copy)]
struct BlockList {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl BlockList {
    const fn new() -> Self {
        Self { head: None, tail: None, len: 0 }
    }

    fn push_front(&mut self, arena: &mut [PageDescriptor], idx: usize) {
        arena[idx].prev = None;
        arena[idx].next = self.head;
        match self.head {
            Some(h) => arena[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }

    fn pop_front(&mut self, arena: &mut [PageDescriptor]) -> Option<usize> {
        let idx = self.head?;
        self.remove(arena, idx);
        Some(idx)
    }

    /// Unlinks `idx` from this list. `idx` must currently be a member.
    fn remove(&mut self, arena: &mut [PageDescriptor], idx: usize) {
        let prev = arena[idx].prev;
        let next = arena[idx].next;
        match prev {
            Some(p) => arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => arena[n].prev = prev,
            None => self.tail = prev,
        }
        arena[idx].prev = None;
        arena[idx].next = None;
        self.len -= 1;
    }
}

/// Watermarks governing the order-0 page cache: below `low`, a `cached_alloc`
/// refills up to `mid`; above `high`, a `cached_free` drains back to `mid`.
#[derive(Clone, Copy, Debug)]
pub struct Watermarks {
    pub low: usize,
    pub mid: usize,
    pub high: usize,
}

impl Watermarks {
    pub const fn new(low: usize, high: usize) -> Self {
        Self { low, mid: (low + high) / 2, high }
    }
}

impl Default for Watermarks {
    /// LOW=10, MID=40, HIGH=70.
    fn default() -> Self {
        Self::new(10, 70)
    }
}

/// One buddy-system instance, owning a contiguous run of page descriptors.
pub struct BuddyAllocator {
    name: String,
    descriptors: Vec<PageDescriptor>,
    pages_total: usize,
    max_order: u8,
    free_area: Vec<BlockList>,
    cache: BlockList,
    watermarks: Watermarks,
}

impl BuddyAllocator {
    /// An allocator with no backing region; must be [`Self::init`]ialised
    /// before use.
    pub const fn new() -> Self {
        Self {
            name: String::new(),
            descriptors: Vec::new(),
            pages_total: 0,
            max_order: 0,
            free_area: Vec::new(),
            cache: BlockList::new(),
            watermarks: Watermarks::new(10, 70),
        }
    }

    /// One-shot construction over `page_count` pages, installed as a
    /// sequence of max-order blocks. `page_count` must be a positive
    /// multiple of `1 << (max_order - 1)`; the original C API's
    /// `region_base` / `descriptor_offset` / `stride` parameters have no
    /// counterpart here since the descriptor arena is an owned `Vec`
    /// rather than a manually placed table. Passing `max_order == 0` uses
    /// [`DEFAULT_MAX_ORDER`] instead of failing.
    pub fn init(&mut self, name: &str, max_order: u8, page_count: usize) -> Result<()> {
        let max_order = if max_order == 0 { DEFAULT_MAX_ORDER } else { max_order };
        if max_order > MAX_SUPPORTED_ORDER || page_count == 0 {
            log::error!(
                "buddy allocator '{name}' init: invalid argument (max_order={max_order}, page_count={page_count})"
            );
            return Err(Error::InvalidArgument);
        }
        let top_block = 1usize << (max_order - 1);
        if page_count % top_block != 0 {
            log::error!(
                "buddy allocator '{name}' init: page_count {page_count} is not a multiple of the top-order block size {top_block}"
            );
            return Err(Error::InvalidArgument);
        }

        self.name = String::from(name);
        self.pages_total = page_count;
        self.max_order = max_order;
        self.descriptors = vec![PageDescriptor::new(); page_count];
        self.free_area = vec![BlockList::new(); max_order as usize];
        self.cache = BlockList::new();
        self.watermarks = Watermarks::default();

        let top_order = max_order - 1;
        let mut idx = 0;
        while idx < page_count {
            self.descriptors[idx] = PageDescriptor {
                flags: PageFlags::FREE | PageFlags::ROOT,
                order: top_order,
                prev: None,
                next: None,
            };
            self.free_area[top_order as usize].push_front(&mut self.descriptors, idx);
            idx += top_block;
        }
        Ok(())
    }

    /// Overrides the default LOW/MID/HIGH cache watermarks.
    pub fn set_watermarks(&mut self, watermarks: Watermarks) {
        self.watermarks = watermarks;
    }

    /// Instance name, as given at [`Self::init`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured maximum order (exclusive upper bound).
    pub fn max_order(&self) -> u8 {
        self.max_order
    }

    /// Allocates a block of exactly `1 << order` pages, splitting a larger
    /// free block if necessary. Returns the page index of the block's root.
    pub fn alloc(&mut self, order: u8) -> Result<usize> {
        if order >= self.max_order {
            log::error!(
                "buddy allocator '{}' alloc: order {order} >= max_order {}",
                self.name,
                self.max_order
            );
            return Err(Error::InvalidArgument);
        }
        let mut k = order;
        while (k as usize) < self.free_area.len() && self.free_area[k as usize].len == 0 {
            k += 1;
        }
        if (k as usize) >= self.free_area.len() {
            return Err(Error::OutOfMemory);
        }

        let idx = self.free_area[k as usize]
            .pop_front(&mut self.descriptors)
            .expect("free_area bucket was non-empty");
        self.descriptors[idx].flags.remove(PageFlags::FREE);

        while k > order {
            k -= 1;
            let half = 1usize << k;
            let buddy_idx = idx + half;
            self.descriptors[buddy_idx] = PageDescriptor {
                flags: PageFlags::FREE | PageFlags::ROOT,
                order: k,
                prev: None,
                next: None,
            };
            self.free_area[k as usize].push_front(&mut self.descriptors, buddy_idx);
        }

        self.descriptors[idx].order = order;
        self.descriptors[idx].flags.insert(PageFlags::ROOT);
        Ok(idx)
    }

    /// Returns a previously allocated block of `order` pages (as returned by
    /// [`Self::alloc`]) and coalesces it with its buddy chain.
    pub fn free(&mut self, idx: usize) -> Result<()> {
        if idx >= self.pages_total {
            log::error!(
                "buddy allocator '{}' free: page index {idx} out of range (total={})",
                self.name,
                self.pages_total
            );
            return Err(Error::InvalidArgument);
        }
        let desc = self.descriptors[idx];
        if desc.flags.contains(PageFlags::FREE) {
            log::error!("buddy allocator '{}' free: double free of page {idx}", self.name);
            return Err(Error::Corruption);
        }
        if !desc.flags.contains(PageFlags::ROOT) {
            log::error!("buddy allocator '{}' free: page {idx} is not a block root", self.name);
            return Err(Error::Corruption);
        }
        self.coalesce_and_install(idx, desc.order);
        Ok(())
    }

    /// Marks `idx` (currently allocated, not on any list) free starting at
    /// order `k`, merging with free buddies as far as possible, then links
    /// the resulting block into `free_area`. Shared by [`Self::free`] and
    /// the cache-drain path in [`Self::cached_free`], which both need to
    /// transition a descriptor from allocated to free without going through
    /// the other's double-free guard.
    fn coalesce_and_install(&mut self, mut idx: usize, mut k: u8) {
        while (k as usize) < self.max_order as usize - 1 {
            let buddy_idx = idx ^ (1usize << k);
            if buddy_idx >= self.pages_total {
                break;
            }
            let buddy = self.descriptors[buddy_idx];
            if !buddy.flags.contains(PageFlags::FREE) || buddy.order != k {
                break;
            }
            self.free_area[k as usize].remove(&mut self.descriptors, buddy_idx);
            let higher = idx.max(buddy_idx);
            // The higher-addressed half stops being a root, but must still
            // read as FREE: when `higher == idx`, it was never marked FREE
            // to begin with (it came in allocated), so clearing ROOT alone
            // would leave it with empty flags.
            self.descriptors[higher].flags.remove(PageFlags::ROOT);
            self.descriptors[higher].flags.insert(PageFlags::FREE);
            idx &= buddy_idx;
            k += 1;
        }
        self.descriptors[idx].order = k;
        self.descriptors[idx].flags = PageFlags::FREE | PageFlags::ROOT;
        self.free_area[k as usize].push_front(&mut self.descriptors, idx);
    }

    /// Returns one order-0 page from the cache, refilling from the buddy
    /// allocator first if the cache has dropped below the LOW watermark.
    pub fn cached_alloc(&mut self) -> Result<usize> {
        if self.cache.len < self.watermarks.low {
            let need = self.watermarks.mid.saturating_sub(self.cache.len);
            for _ in 0..need {
                match self.alloc(0) {
                    Ok(idx) => {
                        self.descriptors[idx].flags.insert(PageFlags::FREE);
                        self.cache.push_front(&mut self.descriptors, idx);
                    }
                    // Best-effort refill: a cold buddy allocator may not
                    // have MID pages of slack left; hand back whatever we
                    // managed to stage.
                    Err(Error::OutOfMemory) => break,
                    Err(e) => return Err(e),
                }
            }
        }
        let idx = self
            .cache
            .pop_front(&mut self.descriptors)
            .ok_or(Error::OutOfMemory)?;
        self.descriptors[idx].flags.remove(PageFlags::FREE);
        Ok(idx)
    }

    /// Returns a page previously obtained from [`Self::cached_alloc`] to the
    /// cache, draining down to MID if the cache has grown past HIGH.
    pub fn cached_free(&mut self, idx: usize) -> Result<()> {
        if idx >= self.pages_total {
            log::error!(
                "buddy allocator '{}' cached_free: page index {idx} out of range (total={})",
                self.name,
                self.pages_total
            );
            return Err(Error::InvalidArgument);
        }
        let desc = self.descriptors[idx];
        if desc.flags.contains(PageFlags::FREE) {
            log::error!("buddy allocator '{}' cached_free: double free of page {idx}", self.name);
            return Err(Error::Corruption);
        }
        if !desc.flags.contains(PageFlags::ROOT) {
            log::error!(
                "buddy allocator '{}' cached_free: page {idx} is not a block root",
                self.name
            );
            return Err(Error::Corruption);
        }
        self.descriptors[idx].flags.insert(PageFlags::FREE);
        self.cache.push_front(&mut self.descriptors, idx);

        if self.cache.len > self.watermarks.high {
            let excess = self.cache.len - self.watermarks.mid;
            for _ in 0..excess {
                if let Some(page) = self.cache.pop_front(&mut self.descriptors) {
                    self.descriptors[page].flags.remove(PageFlags::FREE);
                    self.coalesce_and_install(page, 0);
                }
            }
        }
        Ok(())
    }

    /// Total bytes managed by this instance.
    pub fn total_space(&self) -> usize {
        self.pages_total * PAGE_SIZE
    }

    /// Bytes currently free on the buddy free-lists (excludes the cache).
    pub fn free_space(&self) -> usize {
        self.free_area
            .iter()
            .enumerate()
            .map(|(order, list)| list.len * (1usize << order))
            .sum::<usize>()
            * PAGE_SIZE
    }

    /// Bytes currently held in the order-0 page cache.
    pub fn cached_space(&self) -> usize {
        self.cache.len * PAGE_SIZE
    }

    /// Per-order free-block counts, for diagnostics and the test scenarios
    /// in the property test suite.
    pub fn free_area_counts(&self) -> Vec<usize> {
        self.free_area.iter().map(|l| l.len).collect()
    }

    /// A human-readable summary: per-order free-block counts plus the
    /// cache size.
    pub fn to_string(&self) -> String {
        let mut s = format!("{}: total={} pages", self.name, self.pages_total);
        for (order, list) in self.free_area.iter().enumerate() {
            s.push_str(&format!(" order{}={}", order, list.len));
        }
        s.push_str(&format!(" cache={}", self.cache.len));
        s
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn order_for_count(count: usize) -> Result<u8> {
    if count == 0 {
        return Err(Error::InvalidArgument);
    }
    let rounded = count.next_power_of_two();
    Ok(rounded.trailing_zeros() as u8)
}

impl nos_api::PageAllocator for BuddyAllocator {
    fn alloc_page(&mut self) -> Result<usize> {
        self.alloc(0)
    }

    fn alloc_pages(&mut self, count: usize) -> Result<usize> {
        let order = order_for_count(count)?;
        self.alloc(order)
    }

    fn free_page(&mut self, page: usize) -> Result<()> {
        self.free(page)
    }

    fn free_pages(&mut self, start: usize, count: usize) -> Result<()> {
        let _ = order_for_count(count)?;
        self.free(start)
    }

    fn free_pages_count(&self) -> usize {
        self.free_space() / PAGE_SIZE
    }

    fn total_pages(&self) -> usize {
        self.pages_total
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}

/// Free-function mirror of the external interface named in the
/// specification (`init`/`alloc`/`free`/...), for callers that prefer a
/// C-API-shaped call rather than the method form above.
pub fn init(instance: &mut BuddyAllocator, name: &str, max_order: u8, page_count: usize) -> bool {
    instance.init(name, max_order, page_count).is_ok()
}

pub fn alloc(instance: &mut BuddyAllocator, order: u8) -> Option<usize> {
    instance.alloc(order).ok()
}

pub fn free(instance: &mut BuddyAllocator, page: usize) -> Result<()> {
    instance.free(page)
}

pub fn cached_alloc(instance: &mut BuddyAllocator) -> Option<usize> {
    instance.cached_alloc().ok()
}

pub fn cached_free(instance: &mut BuddyAllocator, page: usize) -> Result<()> {
    instance.cached_free(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_then_merge() {
        let mut a = BuddyAllocator::new();
        a.init("test", 5, 16).unwrap();
        assert_eq!(a.free_area_counts(), vec![0, 0, 0, 0, 1]);

        let block = a.alloc(0).unwrap();
        assert_eq!(a.free_area_counts(), vec![1, 1, 1, 1, 0]);

        a.free(block).unwrap();
        assert_eq!(a.free_area_counts(), vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn exhaustion() {
        let mut a = BuddyAllocator::new();
        a.init("test", 3, 4).unwrap();
        assert!(a.alloc(2).is_ok());
        assert!(matches!(a.alloc(0), Err(Error::OutOfMemory)));
    }

    #[test]
    fn alignment_and_order_round_trip() {
        let mut a = BuddyAllocator::new();
        a.init("test", 6, 32).unwrap();
        for order in 0..5u8 {
            let idx = a.alloc(order).unwrap();
            assert_eq!(idx % (1usize << order), 0);
            a.free(idx).unwrap();
        }
    }

    #[test]
    fn double_free_is_corruption() {
        let mut a = BuddyAllocator::new();
        a.init("test", 3, 4).unwrap();
        let b = a.alloc(0).unwrap();
        a.free(b).unwrap();
        assert!(matches!(a.free(b), Err(Error::Corruption)));
    }

    #[test]
    fn freeing_the_higher_addressed_buddy_last_leaves_correct_flags() {
        let mut a = BuddyAllocator::new();
        a.init("test", 2, 2).unwrap();
        let lo = a.alloc(0).unwrap();
        let hi = a.alloc(0).unwrap();
        assert!(hi > lo);

        a.free(lo).unwrap();
        // `hi` is still allocated here; its descriptor must read as neither
        // free nor root until it is freed.
        assert!(!a.descriptors[hi].is_free());

        a.free(hi).unwrap();
        // The merge just installed a single free root block covering both
        // pages; the non-root descriptor must be FREE (and not ROOT).
        let root = lo.min(hi);
        let sibling = lo.max(hi);
        assert!(a.descriptors[root].is_free());
        assert!(a.descriptors[root].is_root());
        assert!(a.descriptors[sibling].is_free());
        assert!(!a.descriptors[sibling].is_root());
    }

    #[test]
    fn cache_hysteresis() {
        let mut a = BuddyAllocator::new();
        a.init("test", 10, 1024).unwrap();
        let p = a.cached_alloc().unwrap();
        assert_eq!(a.cached_space() / PAGE_SIZE, 39);

        a.cached_free(p).unwrap();
        for _ in 0..31 {
            let extra = a.alloc(0).unwrap();
            a.cached_free(extra).unwrap();
        }
        assert_eq!(a.cached_space() / PAGE_SIZE, 40);
    }

    #[test]
    fn conservation_holds() {
        let mut a = BuddyAllocator::new();
        a.init("test", 7, 64).unwrap();
        let total = a.total_space();
        let mut blocks = Vec::new();
        for _ in 0..8 {
            blocks.push(a.alloc(2).unwrap());
        }
        assert_eq!(a.free_space() + 8 * 4 * PAGE_SIZE, total);
        for b in blocks {
            a.free(b).unwrap();
        }
        assert_eq!(a.free_space(), total);
    }
}
