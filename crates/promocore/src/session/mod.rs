//! Administrator flows as explicit state machines
//!
//! Authoring, editing and deleting items, replacing the shared asset and
//! composing broadcasts. See [`SessionEngine`].

pub mod engine;
pub mod outcome;
pub mod state;

use thiserror::Error;

use crate::content::ContentError;
use crate::ledger::LedgerError;

pub use engine::{parse_link, SessionEngine};
pub use outcome::{AdminInput, Committed, Outcome, Prompt, Rejection};
pub use state::{AssetState, AuthoringState, BroadcastState, DeleteState, EditField, EditState, Session};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Only the configured administrator may run flows
    #[error("permission denied")]
    PermissionDenied,

    #[error("item \"{0}\" not found")]
    NotFound(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type SessionResult<T> = Result<T, SessionError>;
