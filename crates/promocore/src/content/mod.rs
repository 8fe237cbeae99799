//! Promotional items and the shared asset configuration

pub mod asset_config;
pub mod item;
pub mod repository;

use thiserror::Error;

use crate::storage::StoreError;

pub use asset_config::AssetConfig;
pub use item::{AssetFile, ItemField, NewItem, PromoItem};
pub use repository::ContentRepository;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("an item named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("item \"{0}\" not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ContentResult<T> = Result<T, ContentError>;
