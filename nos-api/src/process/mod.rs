//! Process / scheduling module

pub mod interface;

pub use interface::*;
