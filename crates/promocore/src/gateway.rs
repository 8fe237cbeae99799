//! Outbound messaging abstraction
//!
//! The core never talks to Telegram directly. Everything it needs to send
//! goes through [`MessagingGateway`]: replicated payloads (broadcasts, item
//! views) and typed [`Notice`]s whose wording is owned by the frontend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Identity;

/// A labelled link button attached under a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    pub label: String,
    pub url: String,
}

impl CallToAction {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Message content captured from the admin and replicated as-is.
///
/// Media variants carry the transport's file reference, so a copy costs no
/// re-upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Text { text: String },
    Photo { file_id: String, caption: Option<String> },
    Document {
        file_id: String,
        file_name: Option<String>,
        caption: Option<String>,
    },
    Video { file_id: String, caption: Option<String> },
    Animation { file_id: String, caption: Option<String> },
    Audio { file_id: String, caption: Option<String> },
    Voice { file_id: String, caption: Option<String> },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn photo(file_id: impl Into<String>) -> Self {
        Payload::Photo {
            file_id: file_id.into(),
            caption: None,
        }
    }

    pub fn document(file_id: impl Into<String>, file_name: Option<String>) -> Self {
        Payload::Document {
            file_id: file_id.into(),
            file_name,
            caption: None,
        }
    }

    /// Short kind label for logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text { .. } => "text",
            Payload::Photo { .. } => "photo",
            Payload::Document { .. } => "document",
            Payload::Video { .. } => "video",
            Payload::Animation { .. } => "animation",
            Payload::Audio { .. } => "audio",
            Payload::Voice { .. } => "voice",
        }
    }

    /// Plain text body, only for text payloads
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Events the core reports to a user; the frontend picks the wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Someone joined through the recipient's referral code
    ReferralCredited {
        referee_name: Option<String>,
        bonus: u64,
        balance: u64,
    },
    /// The delayed start bonus has been credited
    StartBonusGranted { bonus: u64, balance: u64 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient blocked the bot, deleted the account, or never started a chat
    #[error("recipient {0} is unreachable")]
    Unreachable(Identity),

    /// The transport asked us to slow down
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Outbound side of the chat transport
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Delivers `payload` preserving its kind, with an optional link button.
    async fn send(
        &self,
        recipient: Identity,
        payload: &Payload,
        call_to_action: Option<&CallToAction>,
    ) -> Result<(), DeliveryError>;

    /// Delivers a notice rendered by the frontend.
    async fn notify(&self, recipient: Identity, notice: &Notice) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_and_text() {
        assert_eq!(Payload::text("hi").kind(), "text");
        assert_eq!(Payload::text("hi").as_text(), Some("hi"));
        assert_eq!(Payload::photo("f1").as_text(), None);
        assert_eq!(Payload::document("f2", Some("app.apk".into())).kind(), "document");
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(Payload::photo("abc")).unwrap();
        assert_eq!(json["kind"], "photo");
        assert_eq!(json["file_id"], "abc");
    }
}
