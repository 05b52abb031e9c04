//! Record store adapter.
//!
//! [`Store`] is the async-facing handle over the synchronous store crate plus
//! the change-event bus that live queries fan out from.  The inner mutex is
//! the store's serialization point: every operation locks, commits, and only
//! then publishes its change event.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

use alumlink_shared::constants::DEFAULT_EVENT_CAPACITY;
use alumlink_shared::{PostId, RequestId, UserId};
use alumlink_store::Database;

use crate::error::{EngineError, Result};

/// A change committed to the store.
///
/// Events carry identities only; live queries re-read whatever state they
/// need, so a lagged or dropped event is recovered by the next snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A profile was created or mutated (including rating/session counters).
    ProfileChanged { user_id: UserId },
    /// A request was created or its status transitioned.
    RequestChanged { sender_id: UserId, mentor_id: UserId },
    /// A message was committed to a channel.
    MessageAppended { channel_id: RequestId },
    /// A post was created, liked/unliked, or commented on.
    FeedChanged { post_id: PostId },
}

/// Cheaply clonable handle to the record store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Mutex<Database>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self::with_capacity(db, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(db: Database, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            inner: Arc::new(StoreInner {
                db: Mutex::new(db),
                events,
            }),
        }
    }

    /// Open (or create) a store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    /// Open a fresh in-memory store.  Used by tests and ephemeral setups.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run a closure against the locked database, mapping store errors into
    /// the engine taxonomy.
    pub(crate) fn with_db<T>(
        &self,
        f: impl FnOnce(&mut Database) -> alumlink_store::Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .inner
            .db
            .lock()
            .map_err(|_| EngineError::Internal("store lock poisoned".to_string()))?;
        f(&mut guard).map_err(EngineError::from)
    }

    /// Publish a change event.  Having no live subscriber is not an error.
    pub(crate) fn publish(&self, event: ChangeEvent) {
        debug!(?event, "change committed");
        let _ = self.inner.events.send(event);
    }

    /// Register on the event bus.  Live queries call this *before* taking
    /// their initial snapshot so no committed change can fall in between.
    pub(crate) fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.events.subscribe()
    }
}
