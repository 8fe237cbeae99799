use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::asset_config::ASSET_CONFIG_KEY;
use super::{AssetConfig, AssetFile, ContentError, ContentResult, ItemField, NewItem, PromoItem};
use crate::core::KeyedLocks;
use crate::storage::{self, Collection, RecordStore};

/// CRUD and view counting for promotional items, plus the asset singleton.
///
/// Each item name has its own lock so concurrent edits of one item can't
/// lose each other's writes.
pub struct ContentRepository {
    store: Arc<dyn RecordStore>,
    locks: KeyedLocks<String>,
    config_lock: Mutex<()>,
}

impl ContentRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            config_lock: Mutex::new(()),
        }
    }

    /// # Errors
    /// [`ContentError::DuplicateName`] if an item with that name exists.
    pub async fn create(&self, item: NewItem) -> ContentResult<PromoItem> {
        let name = item.name.trim().to_string();
        let _guard = self.locks.lock(&name).await;

        if self.load(&name).await?.is_some() {
            return Err(ContentError::DuplicateName(name));
        }
        let item = NewItem { name, ..item }.into_item();
        self.save(&item).await?;
        log::info!("Item created: {}", item.name);
        Ok(item)
    }

    pub async fn get(&self, name: &str) -> ContentResult<Option<PromoItem>> {
        self.load(name.trim()).await
    }

    pub async fn exists(&self, name: &str) -> ContentResult<bool> {
        Ok(self.get(name).await?.is_some())
    }

    /// Item names in creation order
    pub async fn list_names(&self) -> ContentResult<Vec<String>> {
        Ok(self
            .store
            .list(Collection::Items)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// `(name, view_count)` for every item, in creation order
    pub async fn view_stats(&self) -> ContentResult<Vec<(String, u64)>> {
        Ok(storage::load_all::<PromoItem>(self.store.as_ref(), Collection::Items)
            .await?
            .into_iter()
            .map(|(name, item)| (name, item.view_count))
            .collect())
    }

    /// Counts one view and returns the item as it should be shown.
    ///
    /// # Errors
    /// [`ContentError::NotFound`] if the item doesn't exist.
    pub async fn record_view(&self, name: &str) -> ContentResult<PromoItem> {
        self.modify(name, |item| item.view_count = item.view_count.saturating_add(1))
            .await
    }

    /// Replaces a single field, leaving the rest untouched.
    ///
    /// # Errors
    /// [`ContentError::NotFound`] if the item doesn't exist.
    pub async fn update_field(&self, name: &str, field: ItemField) -> ContentResult<PromoItem> {
        let item = self.modify(name, |item| field.apply(item)).await?;
        log::info!("Item updated: {}", item.name);
        Ok(item)
    }

    /// # Errors
    /// [`ContentError::NotFound`] if the item doesn't exist.
    pub async fn delete(&self, name: &str) -> ContentResult<()> {
        let name = name.trim().to_string();
        let guard = self.locks.lock(&name).await;
        if !self.store.delete(Collection::Items, &name).await? {
            return Err(ContentError::NotFound(name));
        }
        drop(guard);
        self.locks.prune();
        log::info!("Item deleted: {}", name);
        Ok(())
    }

    async fn modify<F>(&self, name: &str, f: F) -> ContentResult<PromoItem>
    where
        F: FnOnce(&mut PromoItem),
    {
        let name = name.trim().to_string();
        let _guard = self.locks.lock(&name).await;
        let mut item = self.load(&name).await?.ok_or_else(|| ContentError::NotFound(name.clone()))?;
        f(&mut item);
        self.save(&item).await?;
        Ok(item)
    }

    /// The shared asset configuration, default when never set
    pub async fn asset_config(&self) -> ContentResult<AssetConfig> {
        Ok(storage::load(self.store.as_ref(), Collection::Config, ASSET_CONFIG_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Stores a new shared asset. `None` keeps the current description.
    pub async fn set_asset_file(&self, file: AssetFile, description: Option<String>) -> ContentResult<AssetConfig> {
        let _guard = self.config_lock.lock().await;
        let mut config = self.asset_config().await?;
        config.file = Some(file);
        if let Some(description) = description {
            config.description = description;
        }
        config.updated_at = Some(Utc::now());
        storage::save(self.store.as_ref(), Collection::Config, ASSET_CONFIG_KEY, &config).await?;
        log::info!(
            "Asset configured: {}",
            config
                .file
                .as_ref()
                .and_then(|f| f.file_name.as_deref())
                .unwrap_or("(unnamed)")
        );
        Ok(config)
    }

    /// Removes the shared asset. Returns whether one was set.
    pub async fn clear_asset_file(&self) -> ContentResult<bool> {
        let _guard = self.config_lock.lock().await;
        let mut config = self.asset_config().await?;
        let had_file = config.file.take().is_some();
        config.updated_at = Some(Utc::now());
        storage::save(self.store.as_ref(), Collection::Config, ASSET_CONFIG_KEY, &config).await?;
        if had_file {
            log::info!("Asset removed");
        }
        Ok(had_file)
    }

    async fn load(&self, name: &str) -> ContentResult<Option<PromoItem>> {
        Ok(storage::load(self.store.as_ref(), Collection::Items, name).await?)
    }

    async fn save(&self, item: &PromoItem) -> ContentResult<()> {
        Ok(storage::save(self.store.as_ref(), Collection::Items, &item.name, item).await?)
    }
}
