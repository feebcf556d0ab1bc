//! Wire-level data model for topics and their messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single record appended to a topic.
///
/// `index` is assigned by the store at append time and is strictly
/// increasing within a topic, starting at 1, with no gaps and no reuse;
/// the sequence counter survives process restarts. `timestamp` is the
/// wall-clock time of the append and only drives retention; it is not
/// assumed to be monotone across records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    /// The payload, stored and returned verbatim. The store never inspects
    /// or validates its shape.
    pub data: serde_json::Value,
}

/// A batch of messages valid for a given generation ID.
///
/// Returned by one-shot retrieval and pushed, one per non-empty poll, to
/// streaming consumers. The generation ID tells the consumer which dataset
/// instance its cursor is valid against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(rename = "generationID")]
    pub generation_id: String,
    pub messages: Vec<Message>,
}
