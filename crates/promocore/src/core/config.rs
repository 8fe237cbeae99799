//! Runtime configuration
//!
//! Defaults live in the constant modules below. [`Settings::load`] layers an
//! optional TOML file and `PROMO_`-prefixed environment variables on top of
//! them, e.g. `PROMO_ADMIN_ID=42` or `PROMO_LEDGER__REFERRAL_BONUS=3000`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "PROMO_";

/// Default config file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "promobot.toml";

/// Referral economy defaults
pub mod ledger {
    use super::Duration;

    /// Credited to the referrer for every new referred user
    pub const REFERRAL_BONUS: u64 = 2500;

    /// One-time bonus credited after the start delay
    pub const START_BONUS: u64 = 15000;

    /// Minimum balance required to receive the withdrawal code
    pub const MIN_WITHDRAW: u64 = 25000;

    /// Delay between first contact and the start bonus (in seconds)
    pub const START_BONUS_DELAY_SECS: u64 = 90;

    /// Upper bound on code draws before giving up
    pub const MAX_CODE_ATTEMPTS: u32 = 1000;

    /// Start bonus delay duration
    pub fn start_bonus_delay() -> Duration {
        Duration::from_secs(START_BONUS_DELAY_SECS)
    }
}

/// Broadcast throttling defaults
pub mod broadcast {
    use super::Duration;

    /// Pause between two sends (in milliseconds); keeps us under ~30 msg/s
    pub const SEND_DELAY_MS: u64 = 50;

    /// Progress is reported every N attempted sends
    pub const PROGRESS_EVERY: usize = 25;

    /// Send delay duration
    pub fn send_delay() -> Duration {
        Duration::from_millis(SEND_DELAY_MS)
    }
}

/// Admin session defaults
pub mod session {
    /// Idle sessions are discarded after this many seconds (0 disables)
    pub const IDLE_TIMEOUT_SECS: u64 = 1800;

    /// How often the bot sweeps idle sessions (in seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 60;

    /// Longest accepted item name, in characters
    pub const MAX_ITEM_NAME_CHARS: usize = 48;
}

/// Storage defaults
pub mod storage {
    /// Directory (json) or file (sqlite) holding the records
    pub const DATA_PATH: &str = "data";

    /// Log file path; empty disables the file sink
    pub const LOG_FILE_PATH: &str = "promobot.log";
}

/// Which [`crate::storage::RecordStore`] implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per collection under `data_path`
    #[default]
    Json,
    /// A single SQLite database at `data_path`
    Sqlite,
    /// Nothing persisted (tests and dry runs)
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub referral_bonus: u64,
    pub start_bonus: u64,
    pub min_withdraw: u64,
    pub start_bonus_delay_secs: u64,
    pub max_code_attempts: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            referral_bonus: ledger::REFERRAL_BONUS,
            start_bonus: ledger::START_BONUS,
            min_withdraw: ledger::MIN_WITHDRAW,
            start_bonus_delay_secs: ledger::START_BONUS_DELAY_SECS,
            max_code_attempts: ledger::MAX_CODE_ATTEMPTS,
        }
    }
}

impl LedgerSettings {
    pub fn start_bonus_delay(&self) -> Duration {
        Duration::from_secs(self.start_bonus_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub send_delay_ms: u64,
    pub progress_every: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            send_delay_ms: broadcast::SEND_DELAY_MS,
            progress_every: broadcast::PROGRESS_EVERY,
        }
    }
}

impl BroadcastSettings {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Required file extension for the shared asset, without the dot.
    /// Empty accepts any document.
    pub asset_extension: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: session::IDLE_TIMEOUT_SECS,
            sweep_interval_secs: session::SWEEP_INTERVAL_SECS,
            asset_extension: "apk".to_string(),
        }
    }
}

impl SessionSettings {
    /// `None` when expiry is disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn asset_extension(&self) -> Option<&str> {
        let ext = self.asset_extension.trim().trim_start_matches('.');
        (!ext.is_empty()).then_some(ext)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StoreBackend,
    pub data_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_path: PathBuf::from(storage::DATA_PATH),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The single administrator identity (Telegram user id). 0 = no admin.
    pub admin_id: i64,
    /// Bot username without '@', used for referral links
    pub bot_username: String,
    /// External site where users redeem their withdrawal code
    pub withdraw_site_url: String,
    pub log_file_path: String,
    pub ledger: LedgerSettings,
    pub broadcast: BroadcastSettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_id: 0,
            bot_username: String::new(),
            withdraw_site_url: String::new(),
            log_file_path: storage::LOG_FILE_PATH.to_string(),
            ledger: LedgerSettings::default(),
            broadcast: BroadcastSettings::default(),
            session: SessionSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, then `path` (or [`DEFAULT_CONFIG_FILE`]
    /// if it exists), then the environment.
    ///
    /// # Errors
    /// Returns the figment error when a source is malformed or a value has
    /// the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// The layered provider chain, exposed for tests and diagnostics
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match path {
            Some(path) => figment = figment.merge(Toml::file_exact(path)),
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
                }
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn is_admin(&self, identity: i64) -> bool {
        self.admin_id != 0 && identity == self.admin_id
    }
}
