//! Telegram bot integration and handlers

pub mod bot;
pub mod gateway;
pub mod handlers;
pub mod keyboards;
pub mod progress;
pub mod reply;
pub mod texts;

pub use teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use gateway::TelegramGateway;
pub use handlers::{schema, AppDeps, HandlerError};
pub use progress::TelegramProgress;
