//! NOS API - Core interfaces and types for the NOS operating system
//!
//! This crate provides the core interfaces, types, and abstractions shared by
//! the page allocator and the scheduler. It serves as the foundation for
//! communication between those two kernel components.
//!
//! # Architecture
//!
//! - **Core**: Fundamental types and constants.
//! - **Error**: Common error type and result alias.
//! - **Memory**: Memory management abstractions (`PageAllocator`).
//! - **Process**: Process management abstractions (`Scheduler`).
//!
//! # Design Principles
//!
//! - **Dependency Inversion**: high-level modules depend on the traits here,
//!   not on a concrete allocator or scheduler.
//! - **Interface Segregation**: small, focused interfaces.

#![no_std]
#![allow(dead_code)]

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod core;
pub mod error;
pub mod memory;
pub mod process;

pub use crate::core::types::*;
pub use crate::error::{Error, Result};
pub use crate::memory::interface::PageAllocator;
pub use crate::process::interface::Scheduler;
