//! Property tests for the buddy allocator and its page cache.

use nos_memory_management::allocator::buddy::BuddyAllocator;
use proptest::prelude::*;

const MAX_ORDER: u8 = 8;
const PAGE_COUNT: usize = 1 << (MAX_ORDER as u32 - 1); // one top-order block

#[derive(Clone, Debug)]
enum Op {
    Alloc(u8),
    FreeOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..MAX_ORDER - 1).prop_map(Op::Alloc),
        Just(Op::FreeOldest),
    ]
}

proptest! {
    /// free_space + allocated_space == total_space at every quiescent point,
    /// for any interleaving of allocations (bounded order) and frees.
    #[test]
    fn conservation_under_random_workload(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut a = BuddyAllocator::new();
        a.init("prop", MAX_ORDER, PAGE_COUNT).unwrap();
        let total = a.total_space();

        let mut outstanding: Vec<(usize, u8)> = Vec::new();
        let mut allocated_pages: usize = 0;

        for op in ops {
            match op {
                Op::Alloc(order) => {
                    if let Ok(idx) = a.alloc(order) {
                        outstanding.push((idx, order));
                        allocated_pages += 1usize << order;
                    }
                }
                Op::FreeOldest => {
                    if let Some((idx, order)) = outstanding.pop() {
                        a.free(idx).unwrap();
                        allocated_pages -= 1usize << order;
                    }
                }
            }
            prop_assert_eq!(a.free_space() + allocated_pages * 4096, total);
        }
    }

    /// Every block returned by alloc(order) starts on a 1<<order boundary
    /// and round-trips its requested order.
    #[test]
    fn alignment_and_order_round_trip(order in 0..MAX_ORDER - 1) {
        let mut a = BuddyAllocator::new();
        a.init("prop", MAX_ORDER, PAGE_COUNT).unwrap();
        let idx = a.alloc(order).unwrap();
        prop_assert_eq!(idx % (1usize << order), 0);
        a.free(idx).unwrap();
    }
}

#[test]
fn coalescing_completeness() {
    let mut a = BuddyAllocator::new();
    a.init("coalesce", MAX_ORDER, PAGE_COUNT).unwrap();
    let initial = a.free_area_counts();

    let mut blocks = Vec::new();
    for order in 0..MAX_ORDER - 1 {
        blocks.push((a.alloc(order).unwrap(), order));
    }
    for (idx, _) in blocks {
        a.free(idx).unwrap();
    }

    assert_eq!(a.free_area_counts(), initial);
}

#[test]
fn cache_size_stays_bounded() {
    let mut a = BuddyAllocator::new();
    a.init("cache", 12, 1 << 11).unwrap();

    let mut held = Vec::new();
    for _ in 0..500 {
        held.push(a.cached_alloc().unwrap());
    }
    while let Some(p) = held.pop() {
        a.cached_free(p).unwrap();
    }

    assert!(a.cached_space() / 4096 <= 70 + 10);
}
