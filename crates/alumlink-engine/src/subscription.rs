//! Live subscription plumbing.
//!
//! A subscription is a dedicated tokio task feeding an mpsc queue.  The task
//! registers on the store's event bus before taking its initial snapshot,
//! then re-reads on every matching event.  Lag on the bus is harmless: events
//! carry nothing a snapshot cannot recompute, so the handler just reads
//! again.  Failing snapshot queries are retried with a configured backoff;
//! once the attempt budget is spent the subscription surfaces a single
//! `Subscription` error and terminates.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use alumlink_store::Database;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::store::{ChangeEvent, Store};

/// A live query handle.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) aborts the
/// delivery task; nothing is ever delivered again and no other side effect
/// occurs.  Subscriptions have no timeout: they live until cancelled.
pub struct Subscription<T> {
    rx: mpsc::Receiver<Result<T>>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    pub(crate) fn from_parts(rx: mpsc::Receiver<Result<T>>, task: JoinHandle<()>) -> Self {
        Self { rx, task }
    }

    /// Receive the next delivery.  `None` means the subscription has ended.
    pub async fn recv(&mut self) -> Option<Result<T>> {
        self.rx.recv().await
    }

    /// Cancel the subscription.  Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Run a store query under the configured retry budget.
pub(crate) async fn query_with_retry<T, Q>(
    store: &Store,
    attempts: u32,
    delay: Duration,
    query: &Q,
) -> Result<T>
where
    Q: Fn(&mut Database) -> alumlink_store::Result<T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match store.with_db(|db| query(db)) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(error = %e, attempt, "live query failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(EngineError::Subscription(e.to_string())),
        }
    }
}

/// Spawn a snapshot-mode live query: deliver the current result set, then a
/// fresh full result set after every matching change.
pub(crate) fn spawn_snapshot_watch<T, M, Q>(
    store: &Store,
    config: &EngineConfig,
    matches: M,
    query: Q,
) -> Subscription<T>
where
    T: Send + 'static,
    M: Fn(&ChangeEvent) -> bool + Send + 'static,
    Q: Fn(&mut Database) -> alumlink_store::Result<T> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(config.subscription_buffer);
    let mut events = store.watch();
    let store = store.clone();
    let attempts = config.snapshot_retry_attempts;
    let delay = config.snapshot_retry_delay;

    let task = tokio::spawn(async move {
        if !deliver(&store, &tx, &query, attempts, delay).await {
            return;
        }
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !matches(&event) {
                        continue;
                    }
                    if !deliver(&store, &tx, &query, attempts, delay).await {
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event bus lagged, re-snapshotting");
                    if !deliver(&store, &tx, &query, attempts, delay).await {
                        return;
                    }
                }
                Err(RecvError::Closed) => {
                    let _ = tx
                        .send(Err(EngineError::Subscription(
                            "store event bus closed".to_string(),
                        )))
                        .await;
                    return;
                }
            }
        }
    });

    Subscription::from_parts(rx, task)
}

/// Deliver one snapshot.  `false` ends the task: the receiver is gone or the
/// retry budget is spent.
async fn deliver<T, Q>(
    store: &Store,
    tx: &mpsc::Sender<Result<T>>,
    query: &Q,
    attempts: u32,
    delay: Duration,
) -> bool
where
    Q: Fn(&mut Database) -> alumlink_store::Result<T>,
{
    match query_with_retry(store, attempts, delay, query).await {
        Ok(snapshot) => tx.send(Ok(snapshot)).await.is_ok(),
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}
