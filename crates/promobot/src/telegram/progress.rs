//! Broadcast progress reported to the admin chat

use async_trait::async_trait;
use promocore::broadcast::{DeliveryProgress, DeliveryReport, ProgressSink};
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::Mutex;

use super::texts;

/// Keeps one status message per broadcast and edits it as sends go out;
/// the final report arrives as a fresh message.
pub struct TelegramProgress {
    bot: Bot,
    chat: ChatId,
    status: Mutex<Option<MessageId>>,
}

impl TelegramProgress {
    pub fn new(bot: Bot, chat: ChatId) -> Self {
        Self {
            bot,
            chat,
            status: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProgressSink for TelegramProgress {
    async fn progress(&self, progress: &DeliveryProgress) {
        let text = texts::progress(progress);
        let mut status = self.status.lock().await;

        if let Some(id) = *status {
            match self.bot.edit_message_text(self.chat, id, text.clone()).await {
                Ok(_) => return,
                Err(e) => log::debug!("Progress edit failed, sending a new status: {}", e),
            }
        }
        match self.bot.send_message(self.chat, text).await {
            Ok(msg) => *status = Some(msg.id),
            Err(e) => log::warn!("Failed to report broadcast progress: {}", e),
        }
    }

    async fn finished(&self, report: &DeliveryReport) {
        self.status.lock().await.take();
        if let Err(e) = self.bot.send_message(self.chat, texts::report(report)).await {
            log::warn!("Failed to send broadcast report: {}", e);
        }
    }
}
