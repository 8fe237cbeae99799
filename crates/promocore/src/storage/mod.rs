//! Record persistence
//!
//! The rest of the crate talks to storage only through [`RecordStore`], a
//! key → JSON record map per [`Collection`]. Three implementations ship:
//! [`MemoryStore`], [`JsonFileStore`] (one file per collection) and
//! [`SqliteStore`].

pub mod json_file;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use strum::{EnumIter, IntoStaticStr};
use thiserror::Error;

use crate::core::config::{StorageSettings, StoreBackend};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The record kinds the bot persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    /// User records, keyed by identity
    Users,
    /// Promotional items, keyed by display name
    Items,
    /// Configuration singletons, keyed by fixed name
    Config,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A whole collection failed to parse on load
    #[error("collection {collection} is corrupt: {reason}")]
    Corrupt { collection: String, reason: String },

    /// A single record does not match the expected shape
    #[error("record {collection}/{key} is malformed: {source}")]
    Malformed {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("SQLite pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key-value persistence for users, items and configuration.
///
/// Implementations must keep `list` in insertion order: re-upserting an
/// existing key keeps its position, deleting and re-creating moves it to
/// the end.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>>;

    async fn upsert(&self, collection: Collection, key: &str, record: Value) -> StoreResult<()>;

    /// Returns whether a record was removed
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool>;

    async fn list(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>>;
}

/// Reads and deserializes one record
pub async fn load<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.get(collection, key).await? {
        Some(value) => decode(collection, key, value).map(Some),
        None => Ok(None),
    }
}

/// Reads and deserializes a whole collection, in insertion order
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> StoreResult<Vec<(String, T)>> {
    store
        .list(collection)
        .await?
        .into_iter()
        .map(|(key, value)| decode(collection, &key, value).map(|record| (key, record)))
        .collect()
}

/// Serializes and writes one record
pub async fn save<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    key: &str,
    record: &T,
) -> StoreResult<()> {
    store.upsert(collection, key, serde_json::to_value(record)?).await
}

fn decode<T: DeserializeOwned>(collection: Collection, key: &str, value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|source| StoreError::Malformed {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })
}

/// Builds the store selected in the settings
///
/// # Errors
/// Fails when the data directory or database can't be opened.
pub async fn open_store(settings: &StorageSettings) -> StoreResult<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match settings.backend {
        StoreBackend::Json => Arc::new(JsonFileStore::open(&settings.data_path).await?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&settings.data_path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    log::info!(
        "Record store ready: {:?} ({})",
        settings.backend,
        settings.data_path.display()
    );
    Ok(store)
}
