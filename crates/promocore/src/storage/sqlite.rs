use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{Collection, RecordStore, StoreResult};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (collection, key)
);
";

/// SQLite-backed store. rusqlite is blocking, so every call runs on the
/// blocking pool with its own pooled connection.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Opens the database file and ensures the schema exists
    ///
    /// # Errors
    /// Returns an error if the pool can't be built or the schema can't be created.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        let manager = SqliteConnectionManager::file(&path).with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = tokio::task::spawn_blocking(move || -> StoreResult<DbPool> {
            let pool = Pool::builder().max_size(4).build(manager)?;
            pool.get()?.execute_batch(SCHEMA)?;
            Ok(pool)
        })
        .await??;
        Ok(Self { pool })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let key = key.to_string();
        let raw: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT value FROM records WHERE collection = ?1 AND key = ?2",
                        params![collection.as_str(), key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(Into::into)).transpose()
    }

    async fn upsert(&self, collection: Collection, key: &str, record: Value) -> StoreResult<()> {
        let key = key.to_string();
        let raw = serde_json::to_string(&record)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO records (collection, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(collection, key) DO UPDATE
                 SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
                params![collection.as_str(), key, raw],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM records WHERE collection = ?1 AND key = ?2",
                params![collection.as_str(), key],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare("SELECT key, value FROM records WHERE collection = ?1 ORDER BY rowid")?;
                let rows = stmt.query_map(params![collection.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))?;
                let mut out: Vec<(String, String)> = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;
        rows.into_iter()
            .map(|(key, raw)| Ok((key, serde_json::from_str(&raw)?)))
            .collect()
    }
}
