//! NOS Kernel core: buddy-system page allocator and pluggable scheduler.
//!
//! This crate is the hard-engineering core of a small educational kernel:
//!
//! - **Page allocator** (`nos-memory-management`): buddy-system physical
//!   page allocation with a watermarked order-0 page cache.
//! - **Scheduler** (`sched`): a single ordered runqueue, dispatched by one
//!   of six pluggable [`sched::SchedulingPolicy`] implementations chosen at
//!   construction time, protected by one [`sync::MutexIrq`] via
//!   [`sched::LockedRunqueue`].
//! - **Synchronisation** (`sync`): interrupt-masked critical sections
//!   ([`sync::MutexIrq`]) — the only concurrency primitive this core needs,
//!   since it targets a single CPU with a single thread of control split
//!   between process and interrupt context. [`mm::PageAllocator`] and
//!   [`sched::LockedRunqueue`] are its two mandated instances.
//!
//! Filesystems, drivers, IPC, signals, and syscall dispatch are external
//! collaborators, not part of this crate.

#![no_std]
#![allow(dead_code)]

extern crate alloc;

pub mod error;
pub mod mm;
pub mod sched;
pub mod sync;

pub use mm::PageAllocator;
pub use nos_memory_management::allocator::buddy::BuddyAllocator;
pub use sched::{LockedRunqueue, Runqueue, SchedulingPolicy, TaskDescriptor};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_compiles_and_links_its_modules() {
        let _ = crate::BuddyAllocator::new();
        let _ = crate::PageAllocator::new();
    }
}
