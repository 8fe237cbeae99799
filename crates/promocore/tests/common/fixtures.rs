//! Test fixtures
//!
//! [`TestApp`] wires the core services over an in-memory store and a
//! [`MockGateway`], with broadcast throttling turned off.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use promocore::broadcast::{BroadcastDispatcher, DeliveryProgress, DeliveryReport, ProgressSink};
use promocore::content::ContentRepository;
use promocore::ledger::{CodeGenerator, CodeKind, LedgerService};
use promocore::session::SessionEngine;
use promocore::storage::{MemoryStore, RecordStore};
use promocore::{Identity, Settings};

use super::MockGateway;

/// Administrator identity used by every fixture
pub const ADMIN: Identity = 1000;

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.admin_id = ADMIN;
    settings.bot_username = "promo_bot".to_string();
    settings.broadcast.send_delay_ms = 0;
    settings.broadcast.progress_every = 25;
    settings
}

/// Hands out a fixed list of codes, repeating the last one forever
pub struct ScriptedCodes {
    codes: Mutex<VecDeque<String>>,
    draws: Mutex<usize>,
}

impl ScriptedCodes {
    pub fn new<I, S>(codes: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            codes: Mutex::new(codes.into_iter().map(Into::into).collect()),
            draws: Mutex::new(0),
        })
    }

    pub fn draws(&self) -> usize {
        *self.draws.lock().unwrap()
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&self, _kind: CodeKind) -> String {
        *self.draws.lock().unwrap() += 1;
        let mut codes = self.codes.lock().unwrap();
        if codes.len() > 1 {
            codes.pop_front().unwrap()
        } else {
            codes.front().cloned().unwrap_or_else(|| "0000000".to_string())
        }
    }
}

/// Progress sink that keeps what it was told
#[derive(Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<DeliveryProgress>>,
    pub reports: Mutex<Vec<DeliveryReport>>,
}

impl RecordingProgress {
    pub fn last_report(&self) -> Option<DeliveryReport> {
        self.reports.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn progress(&self, progress: &DeliveryProgress) {
        self.updates.lock().unwrap().push(*progress);
    }

    async fn finished(&self, report: &DeliveryReport) {
        self.reports.lock().unwrap().push(*report);
    }
}

pub struct TestApp {
    pub settings: Settings,
    pub store: Arc<dyn RecordStore>,
    pub gateway: Arc<MockGateway>,
    pub ledger: Arc<LedgerService>,
    pub content: Arc<ContentRepository>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub progress: Arc<RecordingProgress>,
    pub engine: Arc<SessionEngine>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Arc::new(MemoryStore::new()), test_settings(), None)
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(Arc::new(MemoryStore::new()), settings, None)
    }

    pub fn with_codes(settings: Settings, codes: Arc<dyn CodeGenerator>) -> Self {
        Self::build(Arc::new(MemoryStore::new()), settings, Some(codes))
    }

    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        Self::build(store, test_settings(), None)
    }

    fn build(store: Arc<dyn RecordStore>, settings: Settings, codes: Option<Arc<dyn CodeGenerator>>) -> Self {
        let gateway = MockGateway::new();
        let mut ledger = LedgerService::new(
            store.clone(),
            gateway.clone(),
            settings.ledger.clone(),
            settings.bot_username.clone(),
        );
        if let Some(codes) = codes {
            ledger = ledger.with_code_generator(codes);
        }
        let ledger = Arc::new(ledger);
        let content = Arc::new(ContentRepository::new(store.clone()));
        let dispatcher = Arc::new(BroadcastDispatcher::new(gateway.clone(), settings.broadcast.clone()));
        let progress = Arc::new(RecordingProgress::default());
        let engine = Arc::new(
            SessionEngine::new(
                settings.admin_id,
                content.clone(),
                ledger.clone(),
                dispatcher.clone(),
                settings.session.clone(),
            )
            .with_progress(progress.clone()),
        );

        Self {
            settings,
            store,
            gateway,
            ledger,
            content,
            dispatcher,
            progress,
            engine,
        }
    }

    /// Registers users `1..=count`
    pub async fn register_users(&self, count: Identity) -> Vec<Identity> {
        let mut ids = Vec::new();
        for id in 1..=count {
            self.ledger.ensure_user(id, None).await.unwrap();
            ids.push(id);
        }
        ids
    }
}
