//! # alumlink-shared
//!
//! Identifier newtypes, domain enums and constants shared by the store and
//! engine crates.  This crate performs no I/O.

pub mod constants;
pub mod types;

pub use types::*;
