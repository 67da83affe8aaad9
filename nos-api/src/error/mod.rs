//! Error handling module for the NOS page allocator and scheduler

use core::fmt;

/// Common error type returned by the page allocator and scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Wraps a coarse [`crate::core::types::KernelError`].
    Kernel(crate::core::types::KernelError),
    /// An argument was out of the valid range (order, count, alignment).
    InvalidArgument,
    /// No block of the requested order or larger is free.
    OutOfMemory,
    /// An internal invariant was violated: double free, non-root free,
    /// or a descriptor whose recorded order does not match its caller.
    Corruption,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Kernel(e) => write!(f, "{}", e),
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::Corruption => write!(f, "invariant violation"),
        }
    }
}

impl From<crate::core::types::KernelError> for Error {
    fn from(e: crate::core::types::KernelError) -> Self {
        Error::Kernel(e)
    }
}

/// Result type for operations that can fail.
pub type Result<T> = core::result::Result<T, Error>;
