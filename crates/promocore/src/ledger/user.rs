use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identity;

/// A participant in the referral economy.
///
/// Stored in the `users` collection under the decimal identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub identity: Identity,
    pub balance: u64,
    /// Set at most once, never to `identity`
    #[serde(default)]
    pub referred_by: Option<Identity>,
    #[serde(default)]
    pub referral_count: u64,
    pub referral_code: String,
    pub withdrawal_code: String,
    #[serde(default)]
    pub start_bonus_granted: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "Utc::now")]
    pub joined_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        identity: Identity,
        display_name: Option<String>,
        referral_code: String,
        withdrawal_code: String,
    ) -> Self {
        Self {
            identity,
            balance: 0,
            referred_by: None,
            referral_count: 0,
            referral_code,
            withdrawal_code,
            start_bonus_granted: false,
            display_name,
            joined_at: Utc::now(),
        }
    }

    /// Store key for an identity
    pub fn key(identity: Identity) -> String {
        identity.to_string()
    }

    pub fn credit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }
}
