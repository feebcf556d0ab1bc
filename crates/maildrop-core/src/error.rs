//! Error types shared across the maildrop crates.

use thiserror::Error;

/// Errors surfaced by message store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failure in the underlying database engine or one of its transactions
    #[error("database error: {0}")]
    Database(String),

    /// A message could not be serialized for storage
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Create a new Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Corrupt error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

/// Errors that terminate a single watch session
///
/// A session error never affects the store or other sessions; the task
/// driving the session logs it and exits.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store could not serve a poll
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The consumer-facing sink rejected a write
    #[error("sink error: {0}")]
    Sink(String),
}
