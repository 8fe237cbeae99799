//! Inline button handlers for the user menu and admin controls

use promocore::content::{ContentError, PromoItem};
use promocore::ledger::WithdrawalStatus;
use promocore::session::AdminInput;
use promocore::Identity;
use teloxide::prelude::*;
use url::Url;

use super::commands::feed;
use super::types::{display_name, identity_of, reply_error, AppDeps};
use crate::telegram::keyboards::{self, CallbackAction};
use crate::telegram::reply::{file, send_authored, send_authored_photo, send_html, CAPTION_LIMIT};
use crate::telegram::texts;

pub async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &AppDeps) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Failed to answer callback query: {}", e);
    }

    let Some(actor) = identity_of(&q.from) else {
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::debug!("Ignoring unknown callback data {:?}", q.data);
        return Ok(());
    };
    // Menus are used in the private chat, whose id is the user id
    let chat_id = ChatId(actor);

    match action {
        CallbackAction::MainMenu => {
            send_html(bot, chat_id, texts::main_menu(), Some(keyboards::main_menu())).await?;
        }
        CallbackAction::Items => show_items(bot, chat_id, deps).await?,
        CallbackAction::Item(name) => show_item(bot, chat_id, &name, deps).await?,
        CallbackAction::ItemAt(index) => match deps.content.list_names().await {
            Ok(names) => match names.get(index) {
                Some(name) => show_item(bot, chat_id, name, deps).await?,
                None => {
                    send_html(bot, chat_id, texts::ITEM_GONE, Some(keyboards::back())).await?;
                }
            },
            Err(e) => reply_error(bot, chat_id, e.into()).await?,
        },
        CallbackAction::Asset => show_asset(bot, chat_id, deps).await?,
        CallbackAction::Earn => show_earn(bot, chat_id, actor, q, deps).await?,
        CallbackAction::Balance => show_balance(bot, chat_id, actor, q, deps).await?,
        CallbackAction::Withdraw => show_withdraw(bot, chat_id, actor, q, deps).await?,
        CallbackAction::AdminSkip => feed(bot, chat_id, actor, AdminInput::Skip, deps).await?,
        CallbackAction::AdminCancel => feed(bot, chat_id, actor, AdminInput::Cancel, deps).await?,
        CallbackAction::AdminConfirm => feed(bot, chat_id, actor, AdminInput::Confirm, deps).await?,
    }

    Ok(())
}

async fn show_items(bot: &Bot, chat_id: ChatId, deps: &AppDeps) -> ResponseResult<()> {
    match deps.content.list_names().await {
        Ok(names) if names.is_empty() => {
            send_html(bot, chat_id, texts::NO_ITEMS, Some(keyboards::back())).await?;
        }
        Ok(names) => {
            send_html(bot, chat_id, texts::ITEMS_HEADER, Some(keyboards::items(&names))).await?;
        }
        Err(e) => reply_error(bot, chat_id, e.into()).await?,
    }
    Ok(())
}

async fn show_item(bot: &Bot, chat_id: ChatId, name: &str, deps: &AppDeps) -> ResponseResult<()> {
    match deps.content.record_view(name).await {
        Ok(item) => send_item(bot, chat_id, &item).await,
        Err(ContentError::NotFound(_)) => {
            send_html(bot, chat_id, texts::ITEM_GONE, Some(keyboards::back())).await?;
            Ok(())
        }
        Err(e) => reply_error(bot, chat_id, e.into()).await,
    }
}

/// Image and body, then the attached file. The buttons go on the last
/// message sent.
async fn send_item(bot: &Bot, chat_id: ChatId, item: &PromoItem) -> ResponseResult<()> {
    let keyboard = keyboards::item(item.call_to_action.as_ref());
    let body_keyboard = item.asset.is_none().then(|| keyboard.clone());

    match item.image.as_deref() {
        Some(image) if item.body.chars().count() <= CAPTION_LIMIT => {
            send_authored_photo(bot, chat_id, image, &item.body, body_keyboard).await?;
        }
        Some(image) => {
            bot.send_photo(chat_id, file(image)).await?;
            send_authored(bot, chat_id, &item.body, body_keyboard).await?;
        }
        None => {
            send_authored(bot, chat_id, &item.body, body_keyboard).await?;
        }
    }

    if let Some(asset) = &item.asset {
        bot.send_document(chat_id, file(&asset.file_id))
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

async fn show_asset(bot: &Bot, chat_id: ChatId, deps: &AppDeps) -> ResponseResult<()> {
    let config = match deps.content.asset_config().await {
        Ok(config) => config,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    match config.file {
        Some(asset) => {
            let caption = if config.description.trim().is_empty() {
                texts::DEFAULT_ASSET_CAPTION.to_string()
            } else {
                config.description
            };
            bot.send_document(chat_id, file(&asset.file_id))
                .caption(caption)
                .reply_markup(keyboards::back())
                .await?;
        }
        None => {
            send_html(bot, chat_id, texts::NO_ASSET, Some(keyboards::back())).await?;
        }
    }
    Ok(())
}

/// Makes sure the presser has a record; menus can outlive a data reset.
async fn ensure_registered(bot: &Bot, chat_id: ChatId, actor: Identity, q: &CallbackQuery, deps: &AppDeps) -> ResponseResult<bool> {
    let name = display_name(&q.from);
    match deps.ledger.ensure_user(actor, name.as_deref()).await {
        Ok(_) => Ok(true),
        Err(e) => {
            reply_error(bot, chat_id, e.into()).await?;
            Ok(false)
        }
    }
}

async fn show_earn(bot: &Bot, chat_id: ChatId, actor: Identity, q: &CallbackQuery, deps: &AppDeps) -> ResponseResult<()> {
    if !ensure_registered(bot, chat_id, actor, q, deps).await? {
        return Ok(());
    }
    let link = match deps.ledger.referral_link(actor).await {
        Ok(link) => link,
        Err(e) => return reply_error(bot, chat_id, e.into()).await,
    };
    let share = keyboards::share_url(&link, texts::share_invite());
    send_html(
        bot,
        chat_id,
        texts::earn(&link, deps.ledger.settings()),
        Some(keyboards::earn(share)),
    )
    .await?;
    Ok(())
}

async fn show_balance(bot: &Bot, chat_id: ChatId, actor: Identity, q: &CallbackQuery, deps: &AppDeps) -> ResponseResult<()> {
    let name = display_name(&q.from);
    match deps.ledger.ensure_user(actor, name.as_deref()).await {
        Ok(user) => {
            let text = texts::balance(&user, deps.ledger.settings().min_withdraw);
            send_html(bot, chat_id, text, Some(keyboards::balance())).await?;
        }
        Err(e) => reply_error(bot, chat_id, e.into()).await?,
    }
    Ok(())
}

async fn show_withdraw(bot: &Bot, chat_id: ChatId, actor: Identity, q: &CallbackQuery, deps: &AppDeps) -> ResponseResult<()> {
    if !ensure_registered(bot, chat_id, actor, q, deps).await? {
        return Ok(());
    }
    match deps.ledger.withdrawal_status(actor).await {
        Ok(WithdrawalStatus::Eligible { code }) => {
            let site = Url::parse(&deps.settings.withdraw_site_url).ok();
            if site.is_none() {
                log::warn!("withdraw_site_url is not a valid URL, sending the code without a link");
            }
            send_html(
                bot,
                chat_id,
                texts::withdraw_eligible(&code),
                Some(keyboards::withdraw(site)),
            )
            .await?;
        }
        Ok(WithdrawalStatus::BelowMinimum { balance, minimum }) => {
            send_html(
                bot,
                chat_id,
                texts::withdraw_below_minimum(balance, minimum),
                Some(keyboards::back()),
            )
            .await?;
        }
        Err(e) => reply_error(bot, chat_id, e.into()).await?,
    }
    Ok(())
}
