//! Physical page allocator module
//!
//! This module contains the buddy-system allocator and its page cache.

pub mod buddy;

use nos_api::Result;

/// Initialize the allocator subsystem.
pub fn initialize() -> Result<()> {
    Ok(())
}

/// Shutdown the allocator subsystem.
pub fn shutdown() -> Result<()> {
    Ok(())
}
