//! # alumlink-engine
//!
//! The mentorship interaction engine: request lifecycle, gated realtime
//! messaging, the community feed with its like set and depth-2 comment tree,
//! the mentor rating aggregator and the alumni directory.
//!
//! All durable state lives in the [`alumlink_store`] record store; the engine
//! holds nothing but a cheap handle to it.  Every public operation is a
//! non-blocking async call that commits at the store's serialization point
//! and then publishes a change event, from which live [`Subscription`]s
//! re-deliver fresh result sets until the caller unsubscribes.

pub mod channel;
pub mod config;
pub mod directory;
pub mod error;
pub mod feed;
pub mod profiles;
pub mod rating;
pub mod requests;
pub mod store;
pub mod subscription;
pub mod views;

pub use config::EngineConfig;
pub use error::{EngineError, Result, ValidationError};
pub use profiles::{NewProfile, ProfilePatch};
pub use store::{ChangeEvent, Store};
pub use subscription::Subscription;
pub use views::*;

/// Engine facade.  Clone freely; clones share the same store handle.
///
/// The operations are grouped by concern across this crate's modules
/// (`requests`, `channel`, `feed`, `rating`, `profiles`, `directory`), each
/// contributing an `impl Engine` block.
#[derive(Clone)]
pub struct Engine {
    store: Store,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Store, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
