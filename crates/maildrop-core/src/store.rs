//! The store capability shared by the persistent backend and test doubles.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::message::{Message, MessagesResponse};

/// Append/get capability of a topic-partitioned message store.
///
/// Both the dispatch layer and watch sessions program against this trait,
/// so alternate backends (in-memory stores for tests) satisfy the same
/// contract as the durable store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append `data` to `topic`, assigning the next per-topic index.
    ///
    /// The topic is created implicitly on first append. The whole append is
    /// atomic: a failure leaves no partial record visible.
    async fn append(&self, topic: &str, data: Value) -> Result<Message, StoreError>;

    /// Fetch messages of `topic` in ascending index order.
    ///
    /// The cursor protocol: when `generation_id` matches the store's
    /// current generation, scanning starts at the first record with index
    /// >= `from_index`. Any other value (including the empty string) makes
    /// the cursor meaningless, and the full history is returned. A topic
    /// that has never seen an append yields an empty batch, not an error.
    async fn get(
        &self,
        topic: &str,
        generation_id: &str,
        from_index: u64,
    ) -> Result<MessagesResponse, StoreError>;
}
