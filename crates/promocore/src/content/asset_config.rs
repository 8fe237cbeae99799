use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetFile;

/// Key of the singleton in the `config` collection
pub const ASSET_CONFIG_KEY: &str = "asset_config";

/// The shared downloadable asset offered from the main menu.
///
/// Never deleted: removing the asset stores `file = None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub file: Option<AssetFile>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssetConfig {
    pub fn is_available(&self) -> bool {
        self.file.is_some()
    }
}
