//! Telegram bot handler tree configuration
//!
//! This module provides the dispatcher schema. Each handler turns one kind of
//! update into calls on the core services and renders the result.

mod admin;
mod callbacks;
mod commands;
mod schema;
mod types;

pub use admin::payload_from_message;
pub use commands::parse_edit_args;
pub use schema::schema;
pub use types::{display_name, identity_of, AppDeps, HandlerError};
