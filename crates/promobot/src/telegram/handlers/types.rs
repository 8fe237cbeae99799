//! Handler types, dependencies and reply helpers

use std::sync::Arc;

use promocore::session::{Outcome, SessionResult};
use promocore::{AppError, ContentRepository, Identity, LedgerService, SessionEngine, Settings};
use teloxide::prelude::*;
use teloxide::types::User;

use crate::telegram::reply::send_html;
use crate::telegram::{keyboards, texts};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct AppDeps {
    pub settings: Arc<Settings>,
    pub ledger: Arc<LedgerService>,
    pub content: Arc<ContentRepository>,
    pub engine: Arc<SessionEngine>,
}

impl AppDeps {
    pub fn new(
        settings: Arc<Settings>,
        ledger: Arc<LedgerService>,
        content: Arc<ContentRepository>,
        engine: Arc<SessionEngine>,
    ) -> Self {
        Self {
            settings,
            ledger,
            content,
            engine,
        }
    }
}

/// Telegram user id as a ledger identity
pub fn identity_of(user: &User) -> Option<Identity> {
    i64::try_from(user.id.0).ok()
}

/// First name, falling back to the username
pub fn display_name(user: &User) -> Option<String> {
    let first = user.first_name.trim();
    if first.is_empty() {
        user.username.clone()
    } else {
        Some(first.to_string())
    }
}

/// Replies with the wording for `err`; internal failures are logged.
pub async fn reply_error(bot: &Bot, chat_id: ChatId, err: AppError) -> ResponseResult<()> {
    if err.is_user_facing() {
        log::info!("Rejected request in chat {}: {}", chat_id, err);
    } else {
        log::error!("Request in chat {} failed: {}", chat_id, err);
    }
    send_html(bot, chat_id, texts::error(&err), None).await?;
    Ok(())
}

/// Renders an engine result: the text for the outcome plus the skip and
/// cancel controls while the session waits for input.
pub async fn reply_outcome(bot: &Bot, chat_id: ChatId, result: SessionResult<Outcome>) -> ResponseResult<()> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    let Some(text) = texts::outcome(&outcome) else {
        return Ok(());
    };
    let keyboard = match &outcome {
        Outcome::Prompt(prompt) | Outcome::Rejected { prompt, .. } => Some(keyboards::admin_controls(prompt)),
        _ => None,
    };
    send_html(bot, chat_id, text, keyboard).await?;
    Ok(())
}
