//! Core utilities: configuration, errors, logging, keyed locks

pub mod config;
pub mod error;
pub mod locks;
pub mod logging;

// Re-exports for convenience
pub use config::Settings;
pub use error::{AppError, AppResult};
pub use locks::KeyedLocks;
pub use logging::{init_logger, log_settings};
