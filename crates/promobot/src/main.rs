use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

use promobot::cli::{Cli, Commands};
use promobot::telegram::{create_bot, schema, setup_bot_commands, AppDeps, TelegramGateway, TelegramProgress};
use promocore::core::{init_logger, log_settings};
use promocore::{open_store, BroadcastDispatcher, ContentRepository, LedgerService, MessagingGateway, SessionEngine, Settings};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the subcommand; no subcommand runs
/// the bot.
///
/// # Errors
/// Returns an error if initialization fails (configuration, logging, storage, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(settings).await,
        Commands::CheckConfig => {
            init_logger("")?;
            log_settings(&settings);
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

async fn run_bot(mut settings: Settings) -> Result<()> {
    init_logger(&settings.log_file_path)?;
    log_settings(&settings);

    let store = open_store(&settings.storage).await?;
    let bot = create_bot()?;

    let me = bot.get_me().await?;
    if settings.bot_username.is_empty() {
        if let Some(username) = me.user.username.clone() {
            log::info!("Using bot username from getMe: @{}", username);
            settings.bot_username = username;
        }
    }
    let settings = Arc::new(settings);

    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let ledger = Arc::new(LedgerService::new(
        store.clone(),
        gateway.clone(),
        settings.ledger.clone(),
        settings.bot_username.clone(),
    ));
    let content = Arc::new(ContentRepository::new(store));
    let dispatcher = Arc::new(BroadcastDispatcher::new(gateway, settings.broadcast.clone()));
    let progress = Arc::new(TelegramProgress::new(bot.clone(), ChatId(settings.admin_id)));
    let engine = Arc::new(
        SessionEngine::new(
            settings.admin_id,
            content.clone(),
            ledger.clone(),
            dispatcher,
            settings.session.clone(),
        )
        .with_progress(progress),
    );
    let sweeper = engine.spawn_sweeper();

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register the command menu: {}", e);
    }

    let deps = AppDeps::new(settings, ledger, content, engine);
    log::info!("Starting bot with long polling");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    log::info!("Bot stopped");
    Ok(())
}
