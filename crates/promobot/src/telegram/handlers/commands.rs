//! Slash command handlers

use std::str::FromStr;

use promocore::session::{AdminInput, EditField, Outcome};
use promocore::Identity;
use teloxide::prelude::*;

use super::types::{display_name, identity_of, reply_error, reply_outcome, AppDeps};
use crate::telegram::bot::Command;
use crate::telegram::reply::send_html;
use crate::telegram::{keyboards, texts};

/// Splits `/edit` arguments into the field and the item name
pub fn parse_edit_args(args: &str) -> Option<(EditField, &str)> {
    let (field, name) = args.trim().split_once(char::is_whitespace)?;
    let field = EditField::from_str(field).ok()?;
    let name = name.trim();
    (!name.is_empty()).then_some((field, name))
}

pub async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &AppDeps) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(actor) = identity_of(user) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let engine = &deps.engine;

    match cmd {
        Command::Start(payload) => {
            let payload = Some(payload.trim()).filter(|p| !p.is_empty());
            let name = display_name(user);
            match deps.ledger.register_start(actor, name.as_deref(), payload).await {
                Ok(start) => {
                    if let Some(referral) = &start.referral {
                        log::info!("Start of {} with referral: {:?}", actor, referral);
                    }
                    send_html(
                        bot,
                        chat_id,
                        texts::welcome(deps.ledger.settings()),
                        Some(keyboards::main_menu()),
                    )
                    .await?;
                }
                Err(e) => reply_error(bot, chat_id, e.into()).await?,
            }
        }
        Command::NewItem => reply_outcome(bot, chat_id, engine.start_authoring(actor).await).await?,
        Command::Edit(args) => match parse_edit_args(&args) {
            Some((field, name)) => reply_outcome(bot, chat_id, engine.start_edit(actor, field, name).await).await?,
            None if engine.is_admin(actor) => {
                send_html(bot, chat_id, texts::EDIT_USAGE, None).await?;
            }
            None => {
                send_html(bot, chat_id, texts::NOT_ADMIN, None).await?;
            }
        },
        Command::Delete(name) => {
            if name.trim().is_empty() {
                show_item_names(bot, chat_id, actor, deps).await?;
            }
            reply_outcome(bot, chat_id, engine.start_delete(actor, Some(&name)).await).await?;
        }
        Command::NewAsset => reply_outcome(bot, chat_id, engine.start_asset_config(actor).await).await?,
        Command::Broadcast => reply_outcome(bot, chat_id, engine.start_broadcast(actor).await).await?,
        Command::Skip => feed(bot, chat_id, actor, AdminInput::Skip, deps).await?,
        Command::Confirm => feed(bot, chat_id, actor, AdminInput::Confirm, deps).await?,
        Command::Cancel => feed(bot, chat_id, actor, AdminInput::Cancel, deps).await?,
        Command::DeleteAsset => {
            if !engine.is_admin(actor) {
                send_html(bot, chat_id, texts::NOT_ADMIN, None).await?;
                return Ok(());
            }
            match deps.content.clear_asset_file().await {
                Ok(true) => {
                    send_html(bot, chat_id, texts::ASSET_REMOVED, None).await?;
                }
                Ok(false) => {
                    send_html(bot, chat_id, texts::ASSET_ALREADY_EMPTY, None).await?;
                }
                Err(e) => reply_error(bot, chat_id, e.into()).await?,
            }
        }
        Command::StopBroadcast => {
            if !engine.is_admin(actor) {
                send_html(bot, chat_id, texts::NOT_ADMIN, None).await?;
                return Ok(());
            }
            let text = if engine.cancel_broadcast().await {
                texts::BROADCAST_STOPPING
            } else {
                texts::NO_BROADCAST
            };
            send_html(bot, chat_id, text, None).await?;
        }
        Command::Stats => {
            if !engine.is_admin(actor) {
                send_html(bot, chat_id, texts::NOT_ADMIN, None).await?;
                return Ok(());
            }
            show_stats(bot, chat_id, deps).await?;
        }
    }

    Ok(())
}

/// Feeds a control input; with no session running there is nothing to do.
pub async fn feed(bot: &Bot, chat_id: ChatId, actor: Identity, input: AdminInput, deps: &AppDeps) -> ResponseResult<()> {
    match deps.engine.handle_input(actor, input).await {
        Ok(Outcome::Idle) => {
            send_html(bot, chat_id, texts::NO_SESSION, None).await?;
            Ok(())
        }
        result => reply_outcome(bot, chat_id, result).await,
    }
}

/// Lists item names ahead of a delete prompt
async fn show_item_names(bot: &Bot, chat_id: ChatId, actor: Identity, deps: &AppDeps) -> ResponseResult<()> {
    if !deps.engine.is_admin(actor) {
        return Ok(());
    }
    match deps.content.list_names().await {
        Ok(names) if !names.is_empty() => {
            let list: Vec<String> = names.iter().map(|n| format!("• {}", texts::escape_html(n))).collect();
            send_html(bot, chat_id, list.join("\n"), None).await?;
        }
        Ok(_) => {
            send_html(bot, chat_id, texts::NO_ITEMS, None).await?;
        }
        Err(e) => log::warn!("Failed to list items: {}", e),
    }
    Ok(())
}

async fn show_stats(bot: &Bot, chat_id: ChatId, deps: &AppDeps) -> ResponseResult<()> {
    let users = match deps.ledger.user_count().await {
        Ok(count) => count,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    let views = match deps.content.view_stats().await {
        Ok(views) => views,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    let asset = match deps.content.asset_config().await {
        Ok(asset) => asset,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    send_html(bot, chat_id, texts::stats(users, &views, &asset), None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_edit_args() {
        assert_eq!(parse_edit_args("body Daily picks"), Some((EditField::Body, "Daily picks")));
        assert_eq!(parse_edit_args("  CTA   Express "), Some((EditField::CallToAction, "Express")));
        assert_eq!(parse_edit_args("photo Daily"), Some((EditField::Image, "Daily")));
        assert_eq!(parse_edit_args("body"), None);
        assert_eq!(parse_edit_args("colour Daily"), None);
        assert_eq!(parse_edit_args(""), None);
    }
}
