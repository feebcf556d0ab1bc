//! Streaming delivery of new messages to a single consumer.
//!
//! A watch session drives the same `get` used for one-shot queries on a
//! timer and forwards each non-empty batch to its sink as one discrete
//! unit. Worst-case delivery latency is bounded by the push interval, and
//! in exchange the store needs no subscriber or notification machinery.
//! Sessions are independent; polls are not shared between sessions
//! watching the same topic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SessionError;
use crate::message::MessagesResponse;
use crate::store::MessageStore;

/// The transport half of a watch session.
///
/// Implementations write one serialized batch per `push` and flush it so
/// the consumer observes it without buffering delay.
#[async_trait]
pub trait WatchSink: Send {
    /// Deliver one batch to the consumer.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written, including when
    /// the consumer has gone away mid-write.
    async fn push(&mut self, response: &MessagesResponse) -> Result<(), SessionError>;

    /// Resolves once the consumer has disconnected.
    async fn closed(&mut self);
}

/// One streaming consumer following a topic.
///
/// The session tracks `{topic, generation_id, next_index}` and adopts the
/// generation ID returned by each poll, so a cursor that crossed a
/// generation boundary self-corrects instead of replaying full history
/// forever.
pub struct WatchSession<K> {
    store: Arc<dyn MessageStore>,
    topic: String,
    generation_id: String,
    next_index: u64,
    push_interval: Duration,
    sink: K,
}

impl<K: WatchSink> WatchSession<K> {
    /// Create a session starting at the consumer-supplied cursor.
    pub fn new(
        store: Arc<dyn MessageStore>,
        topic: impl Into<String>,
        generation_id: impl Into<String>,
        from_index: u64,
        push_interval: Duration,
        sink: K,
    ) -> Self {
        Self {
            store,
            topic: topic.into(),
            generation_id: generation_id.into(),
            next_index: from_index,
            push_interval,
            sink,
        }
    }

    /// Drive the poll/push loop until the consumer disconnects or an error
    /// terminates the session.
    ///
    /// A disconnect ends the session cleanly; store and sink failures are
    /// returned so the owning task can log them. Either way only this one
    /// session is affected.
    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            self.forward_new_messages().await?;

            tokio::select! {
                _ = self.sink.closed() => {
                    debug!(topic = %self.topic, "Watch consumer disconnected");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.push_interval) => {}
            }
        }
    }

    async fn forward_new_messages(&mut self) -> Result<(), SessionError> {
        let response = self
            .store
            .get(&self.topic, &self.generation_id, self.next_index)
            .await?;

        if let Some(last) = response.messages.last() {
            let next_index = last.index + 1;
            self.sink.push(&response).await?;
            self.generation_id = response.generation_id;
            self.next_index = next_index;
        }

        Ok(())
    }
}
