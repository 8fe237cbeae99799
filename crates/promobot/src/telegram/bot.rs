//! Bot initialization and the command set
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu registration

use std::time::Duration;

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// HTTP timeout for Bot API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the main menu")]
    Start(String),
    #[command(description = "create a promotional item (admin)")]
    NewItem,
    #[command(description = "edit an item: /edit <body|image|asset|cta> <name> (admin)")]
    Edit(String),
    #[command(description = "delete an item (admin)")]
    Delete(String),
    #[command(description = "upload the shared file (admin)")]
    NewAsset,
    #[command(description = "remove the shared file (admin)")]
    DeleteAsset,
    #[command(description = "send a message to every user (admin)")]
    Broadcast,
    #[command(description = "stop the running broadcast (admin)")]
    StopBroadcast,
    #[command(description = "skip an optional step (admin)")]
    Skip,
    #[command(description = "confirm a deletion (admin)")]
    Confirm,
    #[command(description = "cancel the current step (admin)")]
    Cancel,
    #[command(description = "users and item views (admin)")]
    Stats,
}

/// Creates a Bot instance with custom or default API URL
///
/// The token is read from `BOT_TOKEN`, falling back to `TELOXIDE_TOKEN`.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token, invalid `BOT_API_URL` or HTTP client failure
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = std::env::var("BOT_TOKEN")
        .or_else(|_| std::env::var("TELOXIDE_TOKEN"))
        .map_err(|_| anyhow::anyhow!("BOT_TOKEN is not set"))?;
    let client = ClientBuilder::new().timeout(REQUEST_TIMEOUT).build()?;
    let bot = Bot::with_client(token, client);

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };

    Ok(bot)
}

/// Registers the command list shown in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
