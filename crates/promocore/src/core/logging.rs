//! Logging initialization
//!
//! All crates log through the `log` facade. [`init_logger`] installs a
//! `tracing` subscriber (console + optional file) and bridges `log` records
//! into it.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::core::config::Settings;

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "info";

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file; empty disables the file sink
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Log file could not be created or a global logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(false);

    let file_layer = if log_file_path.is_empty() {
        None
    } else {
        let file = fs_err::File::create(log_file_path)
            .map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?
            .into_parts()
            .0;
        Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
    };

    let subscriber = Registry::default().with(filter).with(console).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;
    tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("Failed to bridge log records: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup
pub fn log_settings(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if settings.admin_id == 0 {
        log::warn!("admin_id: not set, admin commands are disabled");
    } else {
        log::info!("admin_id: {}", settings.admin_id);
    }
    if settings.bot_username.is_empty() {
        log::warn!("bot_username: not set, referral links will be incomplete");
    }
    log::info!(
        "ledger: referral_bonus={} start_bonus={} min_withdraw={} start_delay={}s",
        settings.ledger.referral_bonus,
        settings.ledger.start_bonus,
        settings.ledger.min_withdraw,
        settings.ledger.start_bonus_delay_secs
    );
    log::info!(
        "broadcast: send_delay={}ms progress_every={}",
        settings.broadcast.send_delay_ms,
        settings.broadcast.progress_every
    );
    match settings.session.idle_timeout() {
        Some(timeout) => log::info!("session: idle timeout {}s", timeout.as_secs()),
        None => log::info!("session: idle timeout disabled"),
    }
    log::info!(
        "storage: {:?} at {}",
        settings.storage.backend,
        settings.storage.data_path.display()
    );
}
