//! # Maildrop Storage
//!
//! The durable, topic-partitioned log store backing maildrop.
//!
//! ## Features
//!
//! - **[`RedbMessageStore`]**: append-only per-topic logs on a redb database,
//!   with durable per-topic sequence counters and a persisted generation ID
//! - **Retention collector**: a background task evicting records older than
//!   the configured retention on a fixed interval
//! - **[`metrics`]**: counter/histogram recording for store operations via
//!   the `metrics` facade
//!
//! ## Example
//!
//! ```rust,ignore
//! use maildrop_storage::{MessageStoreConfig, RedbMessageStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RedbMessageStore::open(MessageStoreConfig {
//!         db_path: "./data/messages.redb".into(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let message = store.append("alerts", json!({"severity": "high"})).unwrap();
//!     assert_eq!(message.index, 1);
//!
//!     let batch = store.get("alerts", store.generation_id(), 0).unwrap();
//!     assert_eq!(batch.messages.len(), 1);
//!
//!     store.close().await;
//! }
//! ```

pub mod metrics;
mod retention;
pub mod store;

// Re-exports
pub use store::{MessageStoreConfig, RedbMessageStore};
