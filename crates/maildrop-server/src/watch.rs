//! Channel-backed sink bridging watch sessions to streamed HTTP bodies.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use maildrop_core::{MessagesResponse, SessionError, WatchSink};

/// Writes each batch as one JSON chunk into a channel whose receiver backs
/// the HTTP response body.
///
/// Every chunk is emitted as its own body frame, so the consumer observes
/// a batch without buffering delay. A dropped receiver means the consumer
/// disconnected.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl WatchSink for ChannelSink {
    async fn push(&mut self, response: &MessagesResponse) -> Result<(), SessionError> {
        let encoded =
            serde_json::to_vec(response).map_err(|e| SessionError::Sink(e.to_string()))?;
        self.tx
            .send(Bytes::from(encoded))
            .await
            .map_err(|_| SessionError::Sink("consumer disconnected".into()))
    }

    async fn closed(&mut self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn sample_response() -> MessagesResponse {
        MessagesResponse {
            generation_id: "g".to_string(),
            messages: vec![maildrop_core::Message {
                index: 1,
                timestamp: Utc::now(),
                data: json!({"k": "v"}),
            }],
        }
    }

    #[tokio::test]
    async fn push_emits_one_chunk_per_batch() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);

        sink.push(&sample_response()).await.unwrap();
        let chunk = rx.recv().await.unwrap();
        let decoded: MessagesResponse = serde_json::from_slice(&chunk).unwrap();
        assert_eq!(decoded.messages.len(), 1);
    }

    #[tokio::test]
    async fn push_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut sink = ChannelSink::new(tx);

        let err = sink.push(&sample_response()).await.unwrap_err();
        assert!(matches!(err, SessionError::Sink(_)));
    }
}
