//! NOS Memory Management - physical page allocator
//!
//! This crate implements a buddy-system physical page allocator with a
//! watermarked order-0 page cache layered on top. It is the sole owner of
//! page-frame bookkeeping; higher layers (kernel heap, page tables) consume
//! it through [`nos_api::memory::interface::PageAllocator`].

#![no_std]
#![warn(clippy::all)]

extern crate alloc;

pub mod physical;
pub mod allocator;

pub use nos_api::{Error, Result};
pub use allocator::buddy::{BuddyAllocator, Watermarks};
pub use physical::{PhysAddr, PAGE_SIZE, PAGE_SHIFT};

/// Orchestrates module-level init/shutdown hooks, mirroring the shape the
/// broader kernel uses to bring up each subsystem in sequence.
pub fn initialize_memory_management() -> Result<()> {
    physical::initialize()?;
    allocator::initialize()?;
    Ok(())
}

/// Reverses [`initialize_memory_management`].
pub fn shutdown_memory_management() -> Result<()> {
    allocator::shutdown()?;
    physical::shutdown()?;
    Ok(())
}
