use thiserror::Error;

use crate::content::ContentError;
use crate::gateway::DeliveryError;
use crate::ledger::LedgerError;
use crate::session::SessionError;
use crate::storage::StoreError;

/// Centralized error type for the application
///
/// Every component error converts into this enum so the bot layer can log
/// and render failures in one place.
///
/// # Example
///
/// ```no_run
/// use promocore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     log::error!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Ledger errors (users, balances, codes)
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Promotional item errors
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Admin session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Messaging gateway delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(Box::new(err))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the error is caused by caller input rather than a broken
    /// dependency. User-facing errors are reported back to the chat; the
    /// rest are logged and replaced by a generic message.
    pub fn is_user_facing(&self) -> bool {
        match self {
            AppError::Ledger(e) => matches!(e, LedgerError::UserNotFound(_)),
            AppError::Content(e) => matches!(e, ContentError::NotFound(_) | ContentError::DuplicateName(_)),
            AppError::Session(e) => matches!(e, SessionError::PermissionDenied | SessionError::NotFound(_)),
            _ => false,
        }
    }
}
