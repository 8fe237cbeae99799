//! Flow positions
//!
//! Each variant carries exactly the fields collected so far, so a state
//! that needs a value always has it.

use strum::{Display, EnumString, IntoStaticStr};

use crate::content::{AssetFile, NewItem};
use crate::gateway::Payload;

/// Item fields an edit flow can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum EditField {
    #[strum(to_string = "body", serialize = "text")]
    Body,
    #[strum(to_string = "image", serialize = "photo")]
    Image,
    #[strum(to_string = "asset", serialize = "file")]
    Asset,
    #[strum(to_string = "cta", serialize = "button")]
    CallToAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authoring(AuthoringState),
    Edit(EditState),
    Delete(DeleteState),
    AssetConfig(AssetState),
    Broadcast(BroadcastState),
}

impl Session {
    pub fn kind(&self) -> &'static str {
        match self {
            Session::Authoring(_) => "authoring",
            Session::Edit(_) => "edit",
            Session::Delete(_) => "delete",
            Session::AssetConfig(_) => "asset",
            Session::Broadcast(_) => "broadcast",
        }
    }
}

/// Creating a new item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringState {
    AwaitName,
    AwaitBody {
        name: String,
    },
    AwaitImage {
        name: String,
        body: String,
    },
    AwaitAsset {
        name: String,
        body: String,
        image: Option<String>,
    },
    /// Everything but the button is known
    AwaitCtaLabel {
        item: NewItem,
    },
    AwaitCtaUrl {
        item: NewItem,
        label: String,
    },
}

/// Replacing one field of an existing item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    AwaitBody { name: String },
    AwaitImage { name: String },
    AwaitAsset { name: String },
    AwaitCtaLabel { name: String },
    AwaitCtaUrl { name: String, label: String },
}

impl EditState {
    pub fn entry(field: EditField, name: String) -> Self {
        match field {
            EditField::Body => EditState::AwaitBody { name },
            EditField::Image => EditState::AwaitImage { name },
            EditField::Asset => EditState::AwaitAsset { name },
            EditField::CallToAction => EditState::AwaitCtaLabel { name },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteState {
    AwaitName,
    AwaitConfirm { name: String },
}

/// Replacing the shared downloadable asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    AwaitFile,
    AwaitDescription { file: AssetFile },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastState {
    AwaitMessage,
    AwaitButtonLabel { payload: Payload },
    AwaitButtonUrl { payload: Payload, label: String },
}
