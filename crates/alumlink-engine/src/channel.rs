//! Realtime messaging channel.
//!
//! A channel is keyed by its request id and materializes lazily on the first
//! append; there is no separate creation step.  Whether the request is in the
//! `Accepted` state is the caller's precondition and is deliberately not
//! re-validated here.  Ordering is by the store-assigned commit sequence, so
//! concurrent sends from both parties resolve to one total order that every
//! subscriber observes identically.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info};

use alumlink_shared::{MessageId, RequestId, UserId};
use alumlink_store::Database;

use crate::error::{EngineError, Result, ValidationError};
use crate::store::{ChangeEvent, Store};
use crate::subscription::{query_with_retry, Subscription};
use crate::views::MessageView;
use crate::Engine;

impl Engine {
    /// Append a message to a channel.
    pub async fn send_message(
        &self,
        channel_id: RequestId,
        sender_id: UserId,
        text: &str,
    ) -> Result<MessageView> {
        let body = text.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let message = self
            .store()
            .with_db(|db| db.append_message(MessageId::new(), channel_id, sender_id, body))?;

        info!(
            message_id = %message.id,
            channel = %channel_id,
            seq = message.seq,
            "message sent"
        );
        self.store()
            .publish(ChangeEvent::MessageAppended { channel_id });
        Ok(MessageView::from(message))
    }

    /// Subscribe to a channel's ordered, append-only message stream.
    ///
    /// A new subscriber first receives the full history in commit order, then
    /// every new arrival exactly once in that same order, until it
    /// unsubscribes.  The task keeps a sequence cursor, so duplicate wakeups
    /// and bus lag never re-deliver or reorder anything.
    pub fn subscribe_channel(&self, channel_id: RequestId) -> Subscription<MessageView> {
        let (tx, rx) = mpsc::channel(self.config().subscription_buffer);
        let mut events = self.store().watch();
        let store = self.store().clone();
        let attempts = self.config().snapshot_retry_attempts;
        let delay = self.config().snapshot_retry_delay;

        let task = tokio::spawn(async move {
            let mut cursor: i64 = 0;
            if !forward_new(&store, &tx, channel_id, &mut cursor, attempts, delay).await {
                return;
            }
            loop {
                match events.recv().await {
                    Ok(ChangeEvent::MessageAppended {
                        channel_id: changed,
                    }) if changed == channel_id => {
                        if !forward_new(&store, &tx, channel_id, &mut cursor, attempts, delay)
                            .await
                        {
                            return;
                        }
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, channel = %channel_id, "event bus lagged, catching up");
                        if !forward_new(&store, &tx, channel_id, &mut cursor, attempts, delay)
                            .await
                        {
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
}

/// Forward every message past the cursor, advancing it per delivery.
/// `false` ends the task: the receiver is gone or the retry budget is spent.
async fn forward_new(
    store: &Store,
    tx: &mpsc::Sender<Result<MessageView>>,
    channel_id: RequestId,
    cursor: &mut i64,
    attempts: u32,
    delay: std::time::Duration,
) -> bool {
    let after = *cursor;
    let query = move |db: &mut Database| db.get_messages_after(channel_id, after);
    let batch = match query_with_retry(store, attempts, delay, &query).await {
        Ok(batch) => batch,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return false;
        }
    };

    for message in batch {
        *cursor = message.seq;
        if tx.send(Ok(MessageView::from(message))).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use alumlink_shared::{ConnectionMode, Decision, Role};
    use crate::testutil::{engine, seed_profile};

    async fn accepted_channel(engine: &Engine) -> (RequestId, UserId, UserId) {
        let student = seed_profile(engine, "Sam", Role::Student).await;
        let mentor = seed_profile(engine, "Mia", Role::Alumni).await;
        let request = engine
            .create_request(student, mentor, "mentor me", ConnectionMode::Chat)
            .await
            .unwrap();
        engine
            .decide(request.id, mentor, Decision::Accept)
            .await
            .unwrap();
        (request.id, student, mentor)
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let engine = engine();
        let (channel, student, _) = accepted_channel(&engine).await;

        let err = engine
            .send_message(channel, student, "   \n\t")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::EmptyMessage)
        ));
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let engine = engine();
        let student = seed_profile(&engine, "Sam", Role::Student).await;

        let err = engine
            .send_message(RequestId::new(), student, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn late_subscriber_gets_history_then_live_tail() {
        let engine = engine();
        let (channel, student, mentor) = accepted_channel(&engine).await;

        engine.send_message(channel, student, "hi").await.unwrap();
        engine.send_message(channel, mentor, "hello").await.unwrap();

        let mut sub = engine.subscribe_channel(channel);
        assert_eq!(sub.recv().await.unwrap().unwrap().text, "hi");
        assert_eq!(sub.recv().await.unwrap().unwrap().text, "hello");

        engine
            .send_message(channel, student, "how are you?")
            .await
            .unwrap();
        assert_eq!(sub.recv().await.unwrap().unwrap().text, "how are you?");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_senders_share_one_total_order() {
        let engine = engine();
        let (channel, student, mentor) = accepted_channel(&engine).await;

        let mut sub_a = engine.subscribe_channel(channel);
        let mut sub_b = engine.subscribe_channel(channel);

        let e1 = engine.clone();
        let e2 = engine.clone();
        let student_task = tokio::spawn(async move {
            for i in 0..20 {
                e1.send_message(channel, student, &format!("s{i}")).await.unwrap();
            }
        });
        let mentor_task = tokio::spawn(async move {
            for i in 0..20 {
                e2.send_message(channel, mentor, &format!("m{i}")).await.unwrap();
            }
        });
        student_task.await.unwrap();
        mentor_task.await.unwrap();

        let mut order_a = Vec::new();
        let mut order_b = Vec::new();
        for _ in 0..40 {
            order_a.push(sub_a.recv().await.unwrap().unwrap());
            order_b.push(sub_b.recv().await.unwrap().unwrap());
        }

        // Identical total order for every subscriber, strictly increasing
        // by commit sequence.
        let texts_a: Vec<_> = order_a.iter().map(|m| m.text.clone()).collect();
        let texts_b: Vec<_> = order_b.iter().map(|m| m.text.clone()).collect();
        assert_eq!(texts_a, texts_b);
        assert!(order_a.windows(2).all(|w| w[0].seq < w[1].seq));

        // Each sender's own messages still appear in their send order.
        let student_only: Vec<String> = texts_a
            .iter()
            .filter(|t| t.starts_with('s'))
            .cloned()
            .collect();
        let expected: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
        assert_eq!(student_only, expected);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_without_side_effects() {
        let engine = engine();
        let (channel, student, _) = accepted_channel(&engine).await;

        let sub = engine.subscribe_channel(channel);
        sub.unsubscribe();

        // Sending keeps working and fresh subscribers still see everything.
        engine.send_message(channel, student, "hi").await.unwrap();
        let mut fresh = engine.subscribe_channel(channel);
        assert_eq!(fresh.recv().await.unwrap().unwrap().text, "hi");
    }
}
