//! redb-backed persistent message store.
//!
//! Layout inside one database file:
//!
//! - `metadata`: a single entry holding the generation ID under a
//!   well-known key, written once when the location is first initialized;
//! - `sequences`: topic name -> last issued index, the durable per-topic
//!   counter (never reused, even after eviction);
//! - one table per topic, named `topic/<name>`, keyed by the fixed-width
//!   big-endian encoding of the index so lexicographic key order equals
//!   numeric order, valued by the JSON-serialized record.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use maildrop_core::{Message, MessageStore, MessagesResponse, StoreError};

use crate::metrics;
use crate::retention::RetentionCollector;

// Key: well-known metadata key, Value: opaque string
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");

// Key: topic name, Value: last issued index for that topic
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const KEY_GENERATION_ID: &str = "generation_id";

const TOPIC_TABLE_PREFIX: &str = "topic/";

/// Configuration for the persistent store
#[derive(Debug, Clone)]
pub struct MessageStoreConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Age beyond which stored records are evicted
    pub retention: Duration,
    /// Interval between eviction cycles
    pub gc_interval: Duration,
}

impl Default for MessageStoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/messages.redb"),
            retention: Duration::from_secs(24 * 60 * 60),
            gc_interval: Duration::from_secs(10 * 60),
        }
    }
}

fn db_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(err.to_string())
}

// Big-endian so that keys sort in numeric index order.
fn key_from_index(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

fn topic_table_name(topic: &str) -> String {
    format!("{TOPIC_TABLE_PREFIX}{topic}")
}

fn topic_table(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

/// Durable, topic-partitioned message store with background retention.
///
/// One instance exclusively owns its storage location for the process
/// lifetime. All mutation goes through [`append`](Self::append) and the
/// retention collector's GC cycles; redb's single-writer/multi-reader
/// transactions keep readers from ever observing a partially written or
/// partially deleted record.
pub struct RedbMessageStore {
    inner: Arc<StoreInner>,
    shutdown_tx: broadcast::Sender<()>,
    collector: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct StoreInner {
    db: Database,
    generation_id: String,
    pub(crate) config: MessageStoreConfig,
}

impl RedbMessageStore {
    /// Open or create the store at the configured path and start the
    /// retention collector.
    ///
    /// A fresh location gets a newly generated generation ID; reopening an
    /// existing one reads the persisted ID back unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    /// This is fatal at startup; there is no degraded mode without durable
    /// storage.
    pub fn open(config: MessageStoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(db_err)?;
        }

        let db = Database::create(&config.db_path).map_err(db_err)?;
        let generation_id = init_tables(&db)?;

        info!(
            path = %config.db_path.display(),
            generation = %generation_id,
            "Opened message store"
        );

        let inner = Arc::new(StoreInner {
            db,
            generation_id,
            config,
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let collector = RetentionCollector::spawn(Arc::clone(&inner), shutdown_rx);

        Ok(Self {
            inner,
            shutdown_tx,
            collector: Mutex::new(Some(collector)),
        })
    }

    /// The generation ID bound to this storage location.
    pub fn generation_id(&self) -> &str {
        &self.inner.generation_id
    }

    /// Append `data` to `topic`, assigning the next durable index.
    pub fn append(&self, topic: &str, data: Value) -> Result<Message, StoreError> {
        let result = self.inner.append(topic, data);
        metrics::record_append(topic, result.is_ok());
        result
    }

    /// Fetch messages of `topic` starting at the consumer's cursor.
    pub fn get(
        &self,
        topic: &str,
        generation_id: &str,
        from_index: u64,
    ) -> Result<MessagesResponse, StoreError> {
        let result = self.inner.get(topic, generation_id, from_index);
        metrics::record_get(topic, result.is_ok());
        result
    }

    /// Delete every record older than `older_than` across all topics and
    /// return how many were removed.
    pub fn gc(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        self.inner.gc(older_than)
    }

    /// Stop the retention collector and wait for it to exit.
    ///
    /// Blocks until the collector's current cycle (if any) has completed,
    /// so no GC ever runs against a store the caller considers closed. The
    /// database handle itself is released when the store is dropped.
    pub async fn close(&self) {
        // Err means the collector already exited.
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.collector.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Retention collector task failed");
            }
        }
    }
}

#[async_trait::async_trait]
impl MessageStore for RedbMessageStore {
    async fn append(&self, topic: &str, data: Value) -> Result<Message, StoreError> {
        RedbMessageStore::append(self, topic, data)
    }

    async fn get(
        &self,
        topic: &str,
        generation_id: &str,
        from_index: u64,
    ) -> Result<MessagesResponse, StoreError> {
        RedbMessageStore::get(self, topic, generation_id, from_index)
    }
}

fn init_tables(db: &Database) -> Result<String, StoreError> {
    let txn = db.begin_write().map_err(db_err)?;
    let generation_id = {
        txn.open_table(SEQUENCES).map_err(db_err)?;

        let mut metadata = txn.open_table(METADATA).map_err(db_err)?;
        let existing = metadata
            .get(KEY_GENERATION_ID)
            .map_err(db_err)?
            .map(|id| id.value().to_string());
        match existing {
            Some(id) => id,
            None => {
                let fresh = Uuid::new_v4().to_string();
                metadata
                    .insert(KEY_GENERATION_ID, fresh.as_str())
                    .map_err(db_err)?;
                fresh
            }
        }
    };
    txn.commit().map_err(db_err)?;
    Ok(generation_id)
}

impl StoreInner {
    fn append(&self, topic: &str, data: Value) -> Result<Message, StoreError> {
        let txn = self.db.begin_write().map_err(db_err)?;
        let message = {
            let mut sequences = txn.open_table(SEQUENCES).map_err(db_err)?;
            let index = sequences
                .get(topic)
                .map_err(db_err)?
                .map(|last| last.value())
                .unwrap_or(0)
                + 1;
            sequences.insert(topic, index).map_err(db_err)?;
            drop(sequences);

            let message = Message {
                index,
                timestamp: Utc::now(),
                data,
            };
            let encoded = serde_json::to_vec(&message)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            let name = topic_table_name(topic);
            let mut messages = txn.open_table(topic_table(&name)).map_err(db_err)?;
            messages
                .insert(key_from_index(index).as_slice(), encoded.as_slice())
                .map_err(db_err)?;
            message
        };
        txn.commit().map_err(db_err)?;
        Ok(message)
    }

    fn get(
        &self,
        topic: &str,
        generation_id: &str,
        from_index: u64,
    ) -> Result<MessagesResponse, StoreError> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let name = topic_table_name(topic);
        let table = match txn.open_table(topic_table(&name)) {
            Ok(table) => table,
            // Topic has never been created; an empty batch, not an error.
            Err(TableError::TableDoesNotExist(_)) => {
                return Ok(MessagesResponse {
                    generation_id: self.generation_id.clone(),
                    messages: Vec::new(),
                });
            }
            Err(e) => return Err(db_err(e)),
        };

        // A cursor is only meaningful against the generation that issued
        // it; anything else starts over from the first record.
        let lower = key_from_index(from_index);
        let range = if generation_id == self.generation_id {
            table.range(lower.as_slice()..).map_err(db_err)?
        } else {
            table.range::<&[u8]>(..).map_err(db_err)?
        };

        let mut messages = Vec::new();
        for entry in range {
            let (_, value) = entry.map_err(db_err)?;
            let message: Message = serde_json::from_slice(value.value())
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            messages.push(message);
        }

        Ok(MessagesResponse {
            generation_id: self.generation_id.clone(),
            messages,
        })
    }

    pub(crate) fn gc(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        let started = Instant::now();
        let result = self.run_gc_cycle(older_than);
        metrics::record_gc_cycle(started.elapsed());
        result
    }

    fn run_gc_cycle(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        let txn = self.db.begin_write().map_err(db_err)?;

        let topics: Vec<String> = txn
            .list_tables()
            .map_err(db_err)?
            .map(|handle| handle.name().to_string())
            .filter(|name| name.starts_with(TOPIC_TABLE_PREFIX))
            .collect();

        let mut deleted = 0;
        for name in &topics {
            let mut table = txn.open_table(topic_table(name)).map_err(db_err)?;

            // Full scan rather than a bounded seek: clock adjustments can
            // leave timestamps out of index order, so no prefix of the
            // table is guaranteed to hold all expired records.
            let mut expired = Vec::new();
            for entry in table.range::<&[u8]>(..).map_err(db_err)? {
                let (key, value) = entry.map_err(db_err)?;
                let message: Message = serde_json::from_slice(value.value())
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                if message.timestamp < older_than {
                    expired.push(key.value().to_vec());
                }
            }

            for key in expired {
                table.remove(key.as_slice()).map_err(db_err)?;
                deleted += 1;
            }
        }

        txn.commit().map_err(db_err)?;
        Ok(deleted)
    }
}
