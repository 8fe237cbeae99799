use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::codes::{draw_unique, CodeGenerator, CodeKind, RandomCodeGenerator};
use super::{
    parse_referral_payload, BonusOutcome, LedgerError, LedgerResult, ReferralOutcome, StartOutcome, UserRecord,
    WithdrawalStatus, REFERRAL_PREFIX,
};
use crate::core::config::LedgerSettings;
use crate::core::KeyedLocks;
use crate::gateway::{MessagingGateway, Notice};
use crate::storage::{self, Collection, RecordStore};
use crate::Identity;

struct PendingBonus {
    id: u64,
    handle: JoinHandle<()>,
}

/// Owns user records and every balance mutation.
///
/// Mutations of one user are serialized through a per-identity lock;
/// referral credit takes both locks in ascending identity order. User
/// creation additionally holds a registration lock so two newcomers can't
/// draw the same code.
pub struct LedgerService {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn MessagingGateway>,
    settings: LedgerSettings,
    bot_username: String,
    codes: Arc<dyn CodeGenerator>,
    locks: KeyedLocks<Identity>,
    registration: Mutex<()>,
    pending_bonuses: DashMap<Identity, PendingBonus>,
    next_task_id: AtomicU64,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn MessagingGateway>,
        settings: LedgerSettings,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
            bot_username: bot_username.into(),
            codes: Arc::new(RandomCodeGenerator),
            locks: KeyedLocks::new(),
            registration: Mutex::new(()),
            pending_bonuses: DashMap::new(),
            next_task_id: AtomicU64::new(0),
        }
    }

    /// Replaces the random code source (tests use scripted codes)
    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Returns the user's record, creating it on first contact.
    ///
    /// A changed display name is written back to an existing record.
    ///
    /// # Errors
    /// [`LedgerError::ExhaustedCodeSpace`] when no free code can be drawn,
    /// or a store error.
    pub async fn ensure_user(&self, identity: Identity, display_name: Option<&str>) -> LedgerResult<UserRecord> {
        let _guard = self.locks.lock(&identity).await;

        if let Some(mut user) = self.load_user(identity).await? {
            if display_name.is_some() && user.display_name.as_deref() != display_name {
                user.display_name = display_name.map(str::to_string);
                self.save_user(&user).await?;
            }
            return Ok(user);
        }

        let _registration = self.registration.lock().await;
        let users = self.load_all_users().await?;
        let referral_codes: HashSet<&str> = users.iter().map(|u| u.referral_code.as_str()).collect();
        let withdrawal_codes: HashSet<&str> = users.iter().map(|u| u.withdrawal_code.as_str()).collect();
        let attempts = self.settings.max_code_attempts;

        let referral_code = draw_unique(self.codes.as_ref(), CodeKind::Referral, &referral_codes, attempts)?;
        let withdrawal_code = draw_unique(self.codes.as_ref(), CodeKind::Withdrawal, &withdrawal_codes, attempts)?;

        let user = UserRecord::new(
            identity,
            display_name.map(str::to_string),
            referral_code,
            withdrawal_code,
        );
        self.save_user(&user).await?;
        log::info!("New user registered: {} (total {})", identity, users.len() + 1);
        Ok(user)
    }

    /// Everything a `/start` does: register, apply a `ref_` payload, and
    /// schedule the start bonus while it is still owed.
    pub async fn register_start(
        self: &Arc<Self>,
        identity: Identity,
        display_name: Option<&str>,
        start_payload: Option<&str>,
    ) -> LedgerResult<StartOutcome> {
        let mut user = self.ensure_user(identity, display_name).await?;

        let referral = match start_payload.and_then(parse_referral_payload) {
            Some(code) => {
                let outcome = self.apply_referral(identity, code).await?;
                if matches!(outcome, ReferralOutcome::Credited { .. }) {
                    user = self.require_user(identity).await?;
                }
                Some(outcome)
            }
            None => None,
        };

        let bonus_scheduled = !user.start_bonus_granted && self.schedule_start_bonus(identity);
        Ok(StartOutcome {
            user,
            referral,
            bonus_scheduled,
        })
    }

    /// Credits the owner of `referrer_code` for bringing in `new_user`.
    ///
    /// Unknown codes, self-referrals and already-referred users are silent
    /// no-ops. `referred_by` is the idempotency key: once set, repeating the
    /// call changes nothing.
    ///
    /// # Errors
    /// [`LedgerError::UserNotFound`] if `new_user` has no record yet.
    pub async fn apply_referral(&self, new_user: Identity, referrer_code: &str) -> LedgerResult<ReferralOutcome> {
        let referrer_code = referrer_code.trim();
        let referrer = match self.find_by_referral_code(referrer_code).await? {
            Some(referrer) => referrer.identity,
            None => {
                if self.load_user(new_user).await?.is_none() {
                    return Err(LedgerError::UserNotFound(new_user));
                }
                log::debug!("Referral code {} from {} does not resolve", referrer_code, new_user);
                return Ok(ReferralOutcome::UnknownCode);
            }
        };
        if referrer == new_user {
            log::debug!("User {} tried to refer themselves", new_user);
            return Ok(ReferralOutcome::SelfReferral);
        }

        let (referee_name, bonus, balance) = {
            let _guards = self.locks.lock_pair(&new_user, &referrer).await;

            let mut referee = self
                .load_user(new_user)
                .await?
                .ok_or(LedgerError::UserNotFound(new_user))?;
            if referee.referred_by.is_some() {
                return Ok(ReferralOutcome::AlreadyReferred);
            }
            let mut referrer_record = self
                .load_user(referrer)
                .await?
                .ok_or(LedgerError::UserNotFound(referrer))?;

            let bonus = self.settings.referral_bonus;
            referee.referred_by = Some(referrer);
            referrer_record.referral_count += 1;
            referrer_record.credit(bonus);

            // The referee is written first: if the second write fails the
            // referral is lost rather than credited twice.
            self.save_user(&referee).await?;
            self.save_user(&referrer_record).await?;
            (referee.display_name, bonus, referrer_record.balance)
        };

        log::info!("Referral credited: {} referred {} (+{})", referrer, new_user, bonus);
        self.notify(
            referrer,
            Notice::ReferralCredited {
                referee_name,
                bonus,
                balance,
            },
        )
        .await;

        Ok(ReferralOutcome::Credited { referrer, balance })
    }

    /// Schedules the start bonus after the configured delay.
    ///
    /// Returns `false` when a grant for this identity is already pending.
    pub fn schedule_start_bonus(self: &Arc<Self>, identity: Identity) -> bool {
        match self.pending_bonuses.entry(identity) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().handle.is_finished() {
                    return false;
                }
                occupied.insert(self.spawn_start_bonus(identity));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.spawn_start_bonus(identity));
            }
        }
        log::debug!(
            "Start bonus for {} scheduled in {}s",
            identity,
            self.settings.start_bonus_delay_secs
        );
        true
    }

    fn spawn_start_bonus(self: &Arc<Self>, identity: Identity) -> PendingBonus {
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let ledger = Arc::clone(self);
        let delay = self.settings.start_bonus_delay();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match ledger.grant_start_bonus(identity).await {
                Ok(outcome) => log::debug!("Start bonus for {}: {:?}", identity, outcome),
                Err(e) => log::error!("Failed to grant start bonus to {}: {}", identity, e),
            }
            ledger.pending_bonuses.remove_if(&identity, |_, pending| pending.id == id);
        });

        PendingBonus { id, handle }
    }

    /// Aborts a pending start bonus. Returns whether one was pending.
    pub fn cancel_start_bonus(&self, identity: Identity) -> bool {
        match self.pending_bonuses.remove(&identity) {
            Some((_, pending)) => {
                let was_pending = !pending.handle.is_finished();
                pending.handle.abort();
                if was_pending {
                    log::info!("Start bonus for {} cancelled", identity);
                }
                was_pending
            }
            None => false,
        }
    }

    pub fn has_pending_start_bonus(&self, identity: Identity) -> bool {
        self.pending_bonuses
            .get(&identity)
            .is_some_and(|pending| !pending.handle.is_finished())
    }

    /// Credits the start bonus unless it was already granted.
    ///
    /// A missing user is not an error. The notification is best-effort: the
    /// bonus stays credited when it fails.
    pub async fn grant_start_bonus(&self, identity: Identity) -> LedgerResult<BonusOutcome> {
        let (bonus, balance) = {
            let _guard = self.locks.lock(&identity).await;
            let Some(mut user) = self.load_user(identity).await? else {
                log::warn!("Start bonus skipped: user {} no longer exists", identity);
                return Ok(BonusOutcome::UserMissing);
            };
            if user.start_bonus_granted {
                return Ok(BonusOutcome::AlreadyGranted);
            }
            let bonus = self.settings.start_bonus;
            user.start_bonus_granted = true;
            user.credit(bonus);
            self.save_user(&user).await?;
            (bonus, user.balance)
        };

        log::info!("Start bonus granted to {} (+{})", identity, bonus);
        self.notify(identity, Notice::StartBonusGranted { bonus, balance })
            .await;
        Ok(BonusOutcome::Granted { balance })
    }

    pub async fn get_user(&self, identity: Identity) -> LedgerResult<Option<UserRecord>> {
        self.load_user(identity).await
    }

    pub async fn get_balance(&self, identity: Identity) -> LedgerResult<u64> {
        Ok(self.require_user(identity).await?.balance)
    }

    pub async fn get_withdrawal_code(&self, identity: Identity) -> LedgerResult<String> {
        Ok(self.require_user(identity).await?.withdrawal_code)
    }

    /// Whether the user may cash out, with the code when they can
    pub async fn withdrawal_status(&self, identity: Identity) -> LedgerResult<WithdrawalStatus> {
        let user = self.require_user(identity).await?;
        let minimum = self.settings.min_withdraw;
        if user.balance >= minimum {
            Ok(WithdrawalStatus::Eligible {
                code: user.withdrawal_code,
            })
        } else {
            Ok(WithdrawalStatus::BelowMinimum {
                balance: user.balance,
                minimum,
            })
        }
    }

    /// `https://t.me/<bot>?start=ref_<code>` for the user's referral code
    pub async fn referral_link(&self, identity: Identity) -> LedgerResult<String> {
        let user = self.require_user(identity).await?;
        Ok(format!(
            "https://t.me/{}?start={}{}",
            self.bot_username, REFERRAL_PREFIX, user.referral_code
        ))
    }

    /// Every known identity, in registration order
    pub async fn all_identities(&self) -> LedgerResult<Vec<Identity>> {
        Ok(self.load_all_users().await?.into_iter().map(|u| u.identity).collect())
    }

    pub async fn user_count(&self) -> LedgerResult<usize> {
        Ok(self.store.list(Collection::Users).await?.len())
    }

    async fn find_by_referral_code(&self, code: &str) -> LedgerResult<Option<UserRecord>> {
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self
            .load_all_users()
            .await?
            .into_iter()
            .find(|user| user.referral_code == code))
    }

    async fn require_user(&self, identity: Identity) -> LedgerResult<UserRecord> {
        self.load_user(identity)
            .await?
            .ok_or(LedgerError::UserNotFound(identity))
    }

    async fn load_user(&self, identity: Identity) -> LedgerResult<Option<UserRecord>> {
        Ok(storage::load(self.store.as_ref(), Collection::Users, &UserRecord::key(identity)).await?)
    }

    async fn load_all_users(&self) -> LedgerResult<Vec<UserRecord>> {
        Ok(storage::load_all::<UserRecord>(self.store.as_ref(), Collection::Users)
            .await?
            .into_iter()
            .map(|(_, user)| user)
            .collect())
    }

    async fn save_user(&self, user: &UserRecord) -> LedgerResult<()> {
        Ok(storage::save(self.store.as_ref(), Collection::Users, &UserRecord::key(user.identity), user).await?)
    }

    async fn notify(&self, recipient: Identity, notice: Notice) {
        if let Err(e) = self.gateway.notify(recipient, &notice).await {
            log::warn!("Failed to notify {}: {}", recipient, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CallToAction, DeliveryError, Payload};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Notices(StdMutex<Vec<(Identity, Notice)>>);

    #[async_trait]
    impl MessagingGateway for Notices {
        async fn send(&self, _: Identity, _: &Payload, _: Option<&CallToAction>) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn notify(&self, recipient: Identity, notice: &Notice) -> Result<(), DeliveryError> {
            self.0.lock().unwrap().push((recipient, notice.clone()));
            Ok(())
        }
    }

    fn ledger() -> (Arc<LedgerService>, Arc<Notices>) {
        let notices = Arc::new(Notices::default());
        let ledger = LedgerService::new(
            Arc::new(MemoryStore::new()),
            notices.clone(),
            LedgerSettings::default(),
            "promo_bot",
        );
        (Arc::new(ledger), notices)
    }

    #[tokio::test]
    async fn test_ensure_user_is_stable() {
        let (ledger, _) = ledger();
        let first = ledger.ensure_user(1, Some("Ann")).await.unwrap();
        let second = ledger.ensure_user(1, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_display_name_refreshed() {
        let (ledger, _) = ledger();
        ledger.ensure_user(1, Some("Ann")).await.unwrap();
        let user = ledger.ensure_user(1, Some("Anna")).await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Anna"));
    }

    #[tokio::test]
    async fn test_referral_link_format() {
        let (ledger, _) = ledger();
        let user = ledger.ensure_user(5, None).await.unwrap();
        let link = ledger.referral_link(5).await.unwrap();
        assert_eq!(link, format!("https://t.me/promo_bot?start=ref_{}", user.referral_code));
    }

    #[tokio::test]
    async fn test_referral_of_unregistered_user_fails() {
        let (ledger, _) = ledger();
        let referrer = ledger.ensure_user(1, None).await.unwrap();
        let err = ledger.apply_referral(2, &referrer.referral_code).await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(2)));
    }

    #[tokio::test]
    async fn test_referral_notifies_once() {
        let (ledger, notices) = ledger();
        let referrer = ledger.ensure_user(1, None).await.unwrap();
        ledger.ensure_user(2, Some("Bob")).await.unwrap();

        ledger.apply_referral(2, &referrer.referral_code).await.unwrap();
        ledger.apply_referral(2, &referrer.referral_code).await.unwrap();

        let notices = notices.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0],
            (
                1,
                Notice::ReferralCredited {
                    referee_name: Some("Bob".to_string()),
                    bonus: 2500,
                    balance: 2500,
                }
            )
        );
    }

    #[tokio::test]
    async fn test_withdrawal_status_threshold() {
        let (ledger, _) = ledger();
        ledger.ensure_user(1, None).await.unwrap();
        assert_eq!(
            ledger.withdrawal_status(1).await.unwrap(),
            WithdrawalStatus::BelowMinimum {
                balance: 0,
                minimum: 25000
            }
        );

        ledger.grant_start_bonus(1).await.unwrap();
        assert_eq!(ledger.get_balance(1).await.unwrap(), 15000);
        assert!(matches!(
            ledger.withdrawal_status(1).await.unwrap(),
            WithdrawalStatus::BelowMinimum { balance: 15000, .. }
        ));
    }

    #[tokio::test]
    async fn test_getters_report_missing_user() {
        let (ledger, _) = ledger();
        assert!(matches!(ledger.get_balance(9).await, Err(LedgerError::UserNotFound(9))));
        assert!(matches!(
            ledger.get_withdrawal_code(9).await,
            Err(LedgerError::UserNotFound(9))
        ));
        assert!(ledger.get_user(9).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_bonus_never_lands() {
        let (ledger, _) = ledger();
        ledger.ensure_user(1, None).await.unwrap();
        assert!(ledger.schedule_start_bonus(1));
        assert!(ledger.has_pending_start_bonus(1));
        assert!(ledger.cancel_start_bonus(1));

        tokio::time::sleep(ledger.settings().start_bonus_delay() * 2).await;
        assert_eq!(ledger.get_balance(1).await.unwrap(), 0);
        assert!(!ledger.has_pending_start_bonus(1));
    }
}
