//! What goes into and comes out of the session engine
//!
//! The engine holds no wording: the frontend renders every [`Prompt`],
//! [`Rejection`] and [`Committed`] value.

use super::EditField;
use crate::gateway::Payload;

/// One admin event fed to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminInput {
    Message(Payload),
    /// Explicit skip of an optional step; not the same as empty text
    Skip,
    Cancel,
    Confirm,
}

impl AdminInput {
    pub fn text(text: impl Into<String>) -> Self {
        AdminInput::Message(Payload::text(text))
    }
}

/// What the admin is asked for next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    ItemName,
    ItemBody,
    ItemImage,
    ItemAsset,
    CtaLabel,
    CtaUrl,
    DeleteName,
    DeleteConfirm { name: String },
    AssetFile { extension: Option<String> },
    AssetDescription,
    BroadcastMessage,
    BroadcastButtonLabel,
    BroadcastButtonUrl,
}

impl Prompt {
    /// Whether a skip is accepted here
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Prompt::ItemImage
                | Prompt::ItemAsset
                | Prompt::CtaLabel
                | Prompt::CtaUrl
                | Prompt::AssetDescription
                | Prompt::BroadcastButtonLabel
                | Prompt::BroadcastButtonUrl
        )
    }
}

/// Why an input was refused; the same step is asked again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ExpectedText,
    ExpectedPhoto,
    ExpectedDocument,
    EmptyText,
    NameTooLong { max: usize },
    DuplicateName(String),
    UnknownItem(String),
    InvalidUrl,
    WrongExtension { expected: String },
    NotSkippable,
    ConfirmationRequired,
}

/// A flow that ended by writing something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Committed {
    ItemCreated { name: String },
    ItemUpdated { name: String, field: EditField },
    ItemDeleted { name: String },
    AssetConfigured { file_name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Input arrived with no session running
    Idle,
    /// The session advanced (or just started)
    Prompt(Prompt),
    /// Input refused; `prompt` is the step being asked again
    Rejected { reason: Rejection, prompt: Prompt },
    Committed(Committed),
    /// The flow ended without writing, e.g. its item vanished meanwhile
    Aborted(Rejection),
    Cancelled,
    /// The session sat idle past the timeout and was dropped
    Expired,
    BroadcastStarted { recipients: usize },
}

impl Outcome {
    /// Whether the session is still running after this outcome
    pub fn keeps_session(&self) -> bool {
        matches!(self, Outcome::Prompt(_) | Outcome::Rejected { .. })
    }
}
