//! # alumlink-store
//!
//! The authoritative record store for the mentorship engine, backed by
//! embedded SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  The store is the single serialization point of the system: it
//! assigns message commit sequences and timestamps, and every conditional or
//! accumulating update (request transitions, like toggles, rating updates)
//! executes here as one atomic statement or transaction.

pub mod comments;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod profiles;
pub mod requests;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
