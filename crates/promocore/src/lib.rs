//! Promocore - referral economy and admin content pipeline, without Telegram
//!
//! Everything here talks to the outside world through two traits: a
//! [`storage::RecordStore`] for persistence and a
//! [`gateway::MessagingGateway`] for outbound messages.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, keyed locks
//! - `storage`: record stores (memory, JSON files, SQLite)
//! - `gateway`: outbound messaging contract
//! - `ledger`: users, referral codes, bonuses, balances
//! - `content`: promotional items and the shared asset
//! - `session`: administrator flows
//! - `broadcast`: fan-out of one message to every user

pub mod broadcast;
pub mod content;
pub mod core;
pub mod gateway;
pub mod ledger;
pub mod session;
pub mod storage;

/// Chat-level user identity (a Telegram user id)
pub type Identity = i64;

// Re-export commonly used types for convenience
pub use broadcast::{BroadcastDispatcher, DeliveryReport, ProgressSink};
pub use content::ContentRepository;
pub use crate::core::{config, AppError, AppResult, Settings};
pub use gateway::{CallToAction, DeliveryError, MessagingGateway, Notice, Payload};
pub use ledger::LedgerService;
pub use session::{AdminInput, Outcome, SessionEngine};
pub use storage::{open_store, RecordStore};
