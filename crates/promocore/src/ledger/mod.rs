//! Referral and balance ledger
//!
//! Owns the user records: code issuance, referral credit, the delayed start
//! bonus and balance reads. Every mutation is a read-modify-write against
//! the record store under a per-identity lock.

pub mod codes;
pub mod service;
pub mod user;

use thiserror::Error;

use crate::storage::StoreError;
use crate::Identity;

pub use codes::{CodeGenerator, CodeKind, RandomCodeGenerator};
pub use service::LedgerService;
pub use user::UserRecord;

/// Start payload prefix carried by referral links
pub const REFERRAL_PREFIX: &str = "ref_";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user {0} not found")]
    UserNotFound(Identity),

    /// No unused code found within the retry budget
    #[error("no free {kind} code after {attempts} attempts")]
    ExhaustedCodeSpace { kind: CodeKind, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of [`LedgerService::apply_referral`]. Only `Credited` changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    Credited { referrer: Identity, balance: u64 },
    UnknownCode,
    SelfReferral,
    AlreadyReferred,
}

/// Result of [`LedgerService::grant_start_bonus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BonusOutcome {
    Granted { balance: u64 },
    AlreadyGranted,
    /// The record vanished before the delay elapsed
    UserMissing,
}

/// Result of [`LedgerService::register_start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub user: UserRecord,
    /// `None` when the start carried no referral payload
    pub referral: Option<ReferralOutcome>,
    pub bonus_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Eligible { code: String },
    BelowMinimum { balance: u64, minimum: u64 },
}

/// Extracts the referral code from a `/start` payload such as `ref_0012345`.
pub fn parse_referral_payload(payload: &str) -> Option<&str> {
    payload
        .trim()
        .strip_prefix(REFERRAL_PREFIX)
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_referral_payload() {
        assert_eq!(parse_referral_payload("ref_0012345"), Some("0012345"));
        assert_eq!(parse_referral_payload("  ref_42 "), Some("42"));
        assert_eq!(parse_referral_payload("ref_"), None);
        assert_eq!(parse_referral_payload("promo"), None);
        assert_eq!(parse_referral_payload(""), None);
    }
}
