//! Flat-file fallback store
//!
//! One `<collection>.json` file per collection, holding a JSON object from
//! key to record. Every write rewrites the whole file through a temporary
//! file and a rename, so a crash mid-write leaves the previous version.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;
use tokio::sync::Mutex;

use super::{Collection, RecordStore, StoreError, StoreResult};

pub struct JsonFileStore {
    dir: PathBuf,
    /// `None` until the collection is first touched
    collections: HashMap<Collection, Mutex<Option<Map<String, Value>>>>,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the data directory. Collections are
    /// loaded lazily on first access.
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs_err::tokio::create_dir_all(&dir).await?;
        let collections = Collection::iter().map(|c| (c, Mutex::new(None))).collect();
        Ok(Self { dir, collections })
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.as_str()))
    }

    fn slot(&self, collection: Collection) -> &Mutex<Option<Map<String, Value>>> {
        // Every variant is inserted in `open`
        &self.collections[&collection]
    }

    async fn read_file(&self, collection: Collection) -> StoreResult<Map<String, Value>> {
        let path = self.path_for(collection);
        let raw = match fs_err::tokio::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Corrupt {
                collection: collection.to_string(),
                reason: format!("expected an object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::Corrupt {
                collection: collection.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write_file(&self, collection: Collection, records: &Map<String, Value>) -> StoreResult<()> {
        let path = self.path_for(collection);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(records)?;
        fs_err::tokio::write(&tmp, body).await?;
        fs_err::tokio::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let mut slot = self.slot(collection).lock().await;
        if slot.is_none() {
            *slot = Some(self.read_file(collection).await?);
        }
        Ok(slot.as_ref().and_then(|records| records.get(key)).cloned())
    }

    async fn upsert(&self, collection: Collection, key: &str, record: Value) -> StoreResult<()> {
        let mut slot = self.slot(collection).lock().await;
        let mut records = match slot.take() {
            Some(records) => records,
            None => self.read_file(collection).await?,
        };
        let previous = records.insert(key.to_string(), record);
        let written = self.write_file(collection, &records).await;
        if written.is_err() {
            // Keep memory in line with what is on disk
            match previous {
                Some(previous) => {
                    records.insert(key.to_string(), previous);
                }
                None => {
                    records.shift_remove(key);
                }
            }
        }
        *slot = Some(records);
        written
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let mut slot = self.slot(collection).lock().await;
        let mut records = match slot.take() {
            Some(records) => records,
            None => self.read_file(collection).await?,
        };
        if !records.contains_key(key) {
            *slot = Some(records);
            return Ok(false);
        }
        let snapshot = records.clone();
        records.shift_remove(key);
        match self.write_file(collection, &records).await {
            Ok(()) => {
                *slot = Some(records);
                Ok(true)
            }
            Err(e) => {
                *slot = Some(snapshot);
                Err(e)
            }
        }
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>> {
        let mut slot = self.slot(collection).lock().await;
        if slot.is_none() {
            *slot = Some(self.read_file(collection).await?);
        }
        Ok(slot
            .as_ref()
            .map(|records| records.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
