use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{Collection, RecordStore, StoreResult};

/// Volatile store, used by tests and the `memory` backend.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|records| records.get(key)).cloned())
    }

    async fn upsert(&self, collection: Collection, key: &str, record: Value) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .and_then(|records| records.shift_remove(key))
            .is_some())
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|records| records.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
