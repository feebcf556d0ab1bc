//! # Maildrop Core
//!
//! Shared contracts for the maildrop message buffer.
//!
//! This crate provides the abstractions that allow the same delivery logic
//! to work with the persistent store and with in-memory test doubles.
//!
//! ## Key Traits
//!
//! - [`MessageStore`]: the append/get capability implemented by every store backend
//! - [`WatchSink`]: one streaming consumer's transport (push a unit, detect disconnect)
//!
//! ## Key Types
//!
//! - [`Message`]: one record in a topic, with its index, timestamp, and payload
//! - [`MessagesResponse`]: a batch of messages bound to a generation ID
//! - [`WatchSession`]: the poll/push loop feeding one streaming consumer

pub mod error;
pub mod message;
pub mod store;
pub mod watch;

// Re-export main types
pub use error::*;
pub use message::*;
pub use store::*;
pub use watch::*;
