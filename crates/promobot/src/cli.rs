use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "promobot")]
#[command(author, version, about = "Telegram bot for referral rewards and promotional broadcasts", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./promobot.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling
    Run,

    /// Load the configuration, print the effective values and exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
