//! Bot API implementation of the core messaging contract

use async_trait::async_trait;
use promocore::gateway::{CallToAction, DeliveryError, MessagingGateway, Notice, Payload};
use promocore::Identity;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{ApiError, RequestError};

use super::reply::file;
use super::{keyboards, texts};

/// Attaches the optional caption and keyboard to a media request, then sends it
macro_rules! send_media {
    ($request:expr, $caption:expr, $keyboard:expr) => {{
        let mut request = $request;
        if let Some(caption) = $caption {
            request = request.caption(caption.clone());
        }
        if let Some(keyboard) = $keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map(drop)
    }};
}

/// Sends through a teloxide [`Bot`], re-using Telegram file ids so media is
/// never uploaded twice.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Classifies a Bot API failure for delivery accounting
pub fn delivery_error(recipient: Identity, err: &RequestError) -> DeliveryError {
    match err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots,
        ) => DeliveryError::Unreachable(recipient),
        RequestError::RetryAfter(seconds) => DeliveryError::RateLimited {
            retry_after_secs: u64::from(seconds.seconds()),
        },
        other => DeliveryError::Failed(other.to_string()),
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send(
        &self,
        recipient: Identity,
        payload: &Payload,
        call_to_action: Option<&CallToAction>,
    ) -> Result<(), DeliveryError> {
        let chat = ChatId(recipient);
        let keyboard = call_to_action.and_then(keyboards::call_to_action);
        let bot = &self.bot;

        let result = match payload {
            Payload::Text { text } => {
                let mut request = bot.send_message(chat, text.clone());
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await.map(drop)
            }
            Payload::Photo { file_id, caption } => send_media!(bot.send_photo(chat, file(file_id)), caption, keyboard),
            Payload::Document { file_id, caption, .. } => {
                send_media!(bot.send_document(chat, file(file_id)), caption, keyboard)
            }
            Payload::Video { file_id, caption } => send_media!(bot.send_video(chat, file(file_id)), caption, keyboard),
            Payload::Animation { file_id, caption } => {
                send_media!(bot.send_animation(chat, file(file_id)), caption, keyboard)
            }
            Payload::Audio { file_id, caption } => send_media!(bot.send_audio(chat, file(file_id)), caption, keyboard),
            Payload::Voice { file_id, caption } => send_media!(bot.send_voice(chat, file(file_id)), caption, keyboard),
        };

        result.map_err(|e| delivery_error(recipient, &e))
    }

    async fn notify(&self, recipient: Identity, notice: &Notice) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(recipient), texts::notice(notice))
            .parse_mode(ParseMode::Html)
            .await
            .map(drop)
            .map_err(|e| delivery_error(recipient, &e))
    }
}
