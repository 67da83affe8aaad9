//! Core module containing fundamental types and constants

pub mod types;

pub use types::*;
