//! Telegram frontend for the promo bot
//!
//! Everything stateful lives in `promocore`; this crate maps Telegram
//! updates onto it and renders what comes back.

pub mod cli;
pub mod telegram;
