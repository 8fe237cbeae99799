//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::admin::handle_admin_message;
use super::callbacks::handle_callback;
use super::commands::handle_command;
use super::types::{identity_of, AppDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::reply::send_html;
use crate::telegram::{keyboards, texts, Bot};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands come first; any other message from the administrator feeds the
/// running session, and everyone else gets the main menu.
///
/// # Arguments
/// * `deps` - Handler dependencies (ledger, content, session engine)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: AppDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_admin = deps.clone();
    let deps_callback = deps.clone();

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(admin_message_handler(deps_admin))
        .branch(user_message_handler())
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: AppDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    log::error!("Command handler failed in chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        },
    ))
}

fn admin_message_handler(deps: AppDeps) -> UpdateHandler<HandlerError> {
    let engine = deps.engine.clone();

    Update::filter_message()
        .filter(move |msg: Message| {
            msg.from
                .as_ref()
                .and_then(identity_of)
                .is_some_and(|id| engine.is_admin(id))
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_admin_message(&bot, &msg, &deps).await {
                    log::error!("Admin message handler failed: {}", e);
                }
                Ok(())
            }
        })
}

/// Anything else in a private chat brings back the main menu
fn user_message_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(|bot: Bot, msg: Message| async move {
            if let Err(e) = send_html(&bot, msg.chat.id, texts::main_menu(), Some(keyboards::main_menu())).await {
                log::warn!("Failed to send the main menu to chat {}: {}", msg.chat.id, e);
            }
            Ok(())
        })
}

fn callback_handler(deps: AppDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_callback(&bot, &q, &deps).await {
                log::error!("Callback handler failed for user {}: {}", q.from.id, e);
            }
            Ok(())
        }
    })
}
