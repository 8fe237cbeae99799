//! Message sending helpers shared by the handlers

use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::RequestError;

/// Telegram limit for media captions, in characters
pub const CAPTION_LIMIT: usize = 1024;

fn is_parse_error(err: &RequestError) -> bool {
    err.to_string().to_lowercase().contains("can't parse entities")
}

pub fn file(file_id: &str) -> InputFile {
    InputFile::file_id(FileId(file_id.to_string()))
}

/// Sends bot-owned HTML text
pub async fn send_html(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<Message> {
    let mut req = bot.send_message(chat_id, text.into()).parse_mode(ParseMode::Html);
    if let Some(kb) = keyboard {
        req = req.reply_markup(kb);
    }
    req.await
}

/// Sends admin-authored text as HTML, falling back to plain text when the
/// markup doesn't parse.
pub async fn send_authored(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<Message> {
    match send_html(bot, chat_id, text, keyboard.clone()).await {
        Ok(msg) => Ok(msg),
        Err(e) if is_parse_error(&e) => {
            let mut retry = bot.send_message(chat_id, text.to_string());
            if let Some(kb) = keyboard {
                retry = retry.reply_markup(kb);
            }
            retry.await
        }
        Err(e) => Err(e),
    }
}

/// Photo with an admin-authored caption, same fallback as [`send_authored`]
pub async fn send_authored_photo(
    bot: &Bot,
    chat_id: ChatId,
    file_id: &str,
    caption: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<Message> {
    let mut req = bot
        .send_photo(chat_id, file(file_id))
        .caption(caption.to_string())
        .parse_mode(ParseMode::Html);
    if let Some(kb) = keyboard.clone() {
        req = req.reply_markup(kb);
    }

    match req.await {
        Ok(msg) => Ok(msg),
        Err(e) if is_parse_error(&e) => {
            let mut retry = bot.send_photo(chat_id, file(file_id)).caption(caption.to_string());
            if let Some(kb) = keyboard {
                retry = retry.reply_markup(kb);
            }
            retry.await
        }
        Err(e) => Err(e),
    }
}
