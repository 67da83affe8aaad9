//! Kernel-local error handling
//!
//! Thin wrapper around [`nos_api::error::Error`] so scheduler and allocator
//! failures surfaced to kernel callers share one type, with a `log::error!`
//! emitted at the point of failure for anything that indicates corruption.

pub use nos_api::{Error, Result};

/// Logs `err` at error level and returns it, for call sites that want to
/// record a diagnostic without duplicating the `log::error!` call.
pub fn report(context: &str, err: Error) -> Error {
    log::error!("{context}: {err}");
    err
}
