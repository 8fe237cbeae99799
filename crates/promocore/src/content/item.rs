use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::CallToAction;

/// A stored file reference plus the name it was uploaded under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl AssetFile {
    pub fn new(file_id: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name,
        }
    }

    /// Case-insensitive check of the file name's extension
    pub fn has_extension(&self, extension: &str) -> bool {
        let Some(name) = self.file_name.as_deref() else {
            return false;
        };
        match name.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case(extension),
            None => false,
        }
    }
}

/// Promotional item, keyed by its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoItem {
    pub name: String,
    pub body: String,
    /// Photo file reference
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub asset: Option<AssetFile>,
    #[serde(default)]
    pub call_to_action: Option<CallToAction>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub body: String,
    pub image: Option<String>,
    pub asset: Option<AssetFile>,
    pub call_to_action: Option<CallToAction>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            image: None,
            asset: None,
            call_to_action: None,
        }
    }

    pub fn into_item(self) -> PromoItem {
        PromoItem {
            name: self.name,
            body: self.body,
            image: self.image,
            asset: self.asset,
            call_to_action: self.call_to_action,
            view_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// One independently editable field with its new value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemField {
    Body(String),
    Image(Option<String>),
    Asset(Option<AssetFile>),
    CallToAction(Option<CallToAction>),
}

impl ItemField {
    pub fn apply(self, item: &mut PromoItem) {
        match self {
            ItemField::Body(body) => item.body = body,
            ItemField::Image(image) => item.image = image,
            ItemField::Asset(asset) => item.asset = asset,
            ItemField::CallToAction(cta) => item.call_to_action = cta,
        }
    }
}
