//! Free-form admin messages feeding the running session

use promocore::session::AdminInput;
use promocore::Payload;
use teloxide::prelude::*;

use super::types::{identity_of, reply_outcome, AppDeps};
use crate::telegram::reply::send_html;
use crate::telegram::texts;

/// Converts an incoming message into a core payload. Animations also carry a
/// document, so they are checked first.
pub fn payload_from_message(msg: &Message) -> Option<Payload> {
    let caption = msg.caption().map(str::to_string);

    if let Some(text) = msg.text() {
        return Some(Payload::text(text));
    }
    if let Some(photos) = msg.photo() {
        // Get the largest photo
        let photo = photos.iter().max_by_key(|p| p.width * p.height)?;
        return Some(Payload::Photo {
            file_id: photo.file.id.0.clone(),
            caption,
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(Payload::Animation {
            file_id: animation.file.id.0.clone(),
            caption,
        });
    }
    if let Some(doc) = msg.document() {
        return Some(Payload::Document {
            file_id: doc.file.id.0.clone(),
            file_name: doc.file_name.clone(),
            caption,
        });
    }
    if let Some(video) = msg.video() {
        return Some(Payload::Video {
            file_id: video.file.id.0.clone(),
            caption,
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(Payload::Audio {
            file_id: audio.file.id.0.clone(),
            caption,
        });
    }
    if let Some(voice) = msg.voice() {
        return Some(Payload::Voice {
            file_id: voice.file.id.0.clone(),
            caption,
        });
    }
    None
}

/// Routes a non-command admin message into the session engine
pub async fn handle_admin_message(bot: &Bot, msg: &Message, deps: &AppDeps) -> ResponseResult<()> {
    let Some(actor) = msg.from.as_ref().and_then(identity_of) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if msg.text().is_some_and(|t| t.starts_with('/')) {
        send_html(bot, chat_id, texts::UNKNOWN_COMMAND, None).await?;
        return Ok(());
    }
    let Some(payload) = payload_from_message(msg) else {
        log::debug!("Unsupported admin message kind in chat {}", chat_id);
        return Ok(());
    };

    // Idle renders to nothing, so plain chatter from the admin stays silent
    reply_outcome(bot, chat_id, deps.engine.handle_input(actor, AdminInput::Message(payload)).await).await
}
