//! Recording messaging gateway
//!
//! Stores every send and notice in memory. Recipients marked unreachable
//! fail the way a blocked chat does.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use promocore::gateway::{CallToAction, DeliveryError, MessagingGateway, Notice, Payload};
use promocore::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: Identity,
    pub payload: Payload,
    pub call_to_action: Option<CallToAction>,
}

#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    notices: Mutex<Vec<(Identity, Notice)>>,
    unreachable: Mutex<HashSet<Identity>>,
    fail_notices: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_unreachable(&self, recipients: impl IntoIterator<Item = Identity>) {
        self.unreachable.lock().unwrap().extend(recipients);
    }

    /// Every later `notify` fails
    pub fn fail_notices(&self) {
        self.fail_notices.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<(Identity, Notice)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn notices_for(&self, recipient: Identity) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, n)| n)
            .collect()
    }

    fn check_reachable(&self, recipient: Identity) -> Result<(), DeliveryError> {
        if self.unreachable.lock().unwrap().contains(&recipient) {
            Err(DeliveryError::Unreachable(recipient))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send(
        &self,
        recipient: Identity,
        payload: &Payload,
        call_to_action: Option<&CallToAction>,
    ) -> Result<(), DeliveryError> {
        self.check_reachable(recipient)?;
        self.sent.lock().unwrap().push(SentMessage {
            recipient,
            payload: payload.clone(),
            call_to_action: call_to_action.cloned(),
        });
        Ok(())
    }

    async fn notify(&self, recipient: Identity, notice: &Notice) -> Result<(), DeliveryError> {
        if self.fail_notices.load(Ordering::SeqCst) {
            return Err(DeliveryError::Failed("notifications disabled".to_string()));
        }
        self.check_reachable(recipient)?;
        self.notices.lock().unwrap().push((recipient, notice.clone()));
        Ok(())
    }
}
