use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::config::BroadcastSettings;
use crate::gateway::{CallToAction, DeliveryError, MessagingGateway, Payload};
use crate::Identity;

/// Final accounting of one dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Recipients in the snapshot
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Stopped through the cancel token before reaching every recipient
    pub cancelled: bool,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Snapshot passed to a [`ProgressSink`] while a dispatch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryProgress {
    pub attempted: usize,
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Receives progress of a running broadcast, typically the admin's chat
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn progress(&self, progress: &DeliveryProgress);

    async fn finished(&self, report: &DeliveryReport);
}

/// Sink that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn progress(&self, p: &DeliveryProgress) {
        log::info!(
            "Broadcast progress: {}/{} ({} delivered, {} failed)",
            p.attempted,
            p.total,
            p.delivered,
            p.failed
        );
    }

    async fn finished(&self, report: &DeliveryReport) {
        log::info!("Broadcast finished: {:?}", report);
    }
}

/// A broadcast running as its own task
pub struct BroadcastHandle {
    cancel: CancellationToken,
    task: JoinHandle<DeliveryReport>,
}

impl BroadcastHandle {
    /// Stops the run before its next send
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<DeliveryReport, JoinError> {
        self.task.await
    }
}

/// Replicates one payload to a recipient list through the gateway.
///
/// Sends are sequential with a fixed pause in between. A failed recipient
/// is counted and skipped; nothing is retried.
pub struct BroadcastDispatcher {
    gateway: Arc<dyn MessagingGateway>,
    settings: BroadcastSettings,
}

impl BroadcastDispatcher {
    pub fn new(gateway: Arc<dyn MessagingGateway>, settings: BroadcastSettings) -> Self {
        Self { gateway, settings }
    }

    pub async fn dispatch(
        &self,
        payload: &Payload,
        recipients: &[Identity],
        call_to_action: Option<&CallToAction>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> DeliveryReport {
        let mut report = DeliveryReport {
            total: recipients.len(),
            ..DeliveryReport::default()
        };
        let delay = self.settings.send_delay();
        let every = self.settings.progress_every;

        log::info!(
            "Broadcasting {} to {} recipients{}",
            payload.kind(),
            report.total,
            if call_to_action.is_some() { " with button" } else { "" }
        );

        for (index, &recipient) in recipients.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if index > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self.gateway.send(recipient, payload, call_to_action).await {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Unreachable(_)) => {
                    log::debug!("Broadcast: {} unreachable", recipient);
                    report.failed += 1;
                }
                Err(e) => {
                    log::warn!("Broadcast to {} failed: {}", recipient, e);
                    report.failed += 1;
                }
            }

            let attempted = report.attempted();
            if every > 0 && attempted % every == 0 && attempted < report.total {
                progress
                    .progress(&DeliveryProgress {
                        attempted,
                        total: report.total,
                        delivered: report.delivered,
                        failed: report.failed,
                    })
                    .await;
            }
        }

        if report.cancelled {
            log::warn!(
                "Broadcast cancelled after {}/{} sends",
                report.attempted(),
                report.total
            );
        }
        progress.finished(&report).await;
        report
    }

    /// Runs [`Self::dispatch`] as an independent task.
    pub fn spawn(
        self: &Arc<Self>,
        payload: Payload,
        recipients: Vec<Identity>,
        call_to_action: Option<CallToAction>,
        progress: Arc<dyn ProgressSink>,
    ) -> BroadcastHandle {
        let cancel = CancellationToken::new();
        let dispatcher = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            dispatcher
                .dispatch(
                    &payload,
                    &recipients,
                    call_to_action.as_ref(),
                    progress.as_ref(),
                    &token,
                )
                .await
        });
        BroadcastHandle { cancel, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Notice;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(Identity, Option<CallToAction>)>>,
    }

    #[async_trait]
    impl MessagingGateway for Recorder {
        async fn send(
            &self,
            recipient: Identity,
            _payload: &Payload,
            cta: Option<&CallToAction>,
        ) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push((recipient, cta.cloned()));
            if recipient % 2 == 0 {
                Err(DeliveryError::Failed("even".into()))
            } else {
                Ok(())
            }
        }

        async fn notify(&self, _: Identity, _: &Notice) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Progress(Mutex<Vec<usize>>);

    #[async_trait]
    impl ProgressSink for Progress {
        async fn progress(&self, p: &DeliveryProgress) {
            self.0.lock().unwrap().push(p.attempted);
        }

        async fn finished(&self, _report: &DeliveryReport) {}
    }

    fn dispatcher(gateway: Arc<Recorder>, progress_every: usize) -> BroadcastDispatcher {
        BroadcastDispatcher::new(
            gateway,
            BroadcastSettings {
                send_delay_ms: 0,
                progress_every,
            },
        )
    }

    #[tokio::test]
    async fn test_button_attached_to_every_copy() {
        let gateway = Arc::new(Recorder::default());
        let cta = CallToAction::new("Open", "https://example.com");
        let report = dispatcher(gateway.clone(), 0)
            .dispatch(
                &Payload::text("hello"),
                &[1, 2, 3],
                Some(&cta),
                &LogProgress,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            report,
            DeliveryReport {
                total: 3,
                delivered: 2,
                failed: 1,
                cancelled: false
            }
        );
        let sent = gateway.sent.lock().unwrap();
        assert!(sent.iter().all(|(_, c)| c.as_ref() == Some(&cta)));
    }

    #[tokio::test]
    async fn test_progress_every_n_sends() {
        let gateway = Arc::new(Recorder::default());
        let progress = Progress::default();
        let recipients: Vec<Identity> = (1..=10).collect();
        dispatcher(gateway, 3)
            .dispatch(
                &Payload::text("x"),
                &recipients,
                None,
                &progress,
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(*progress.0.lock().unwrap(), vec![3, 6, 9]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_sends_nothing() {
        let gateway = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        token.cancel();
        let report = dispatcher(gateway.clone(), 0)
            .dispatch(&Payload::text("x"), &[1, 3], None, &LogProgress, &token)
            .await;
        assert!(report.cancelled);
        assert_eq!(report.attempted(), 0);
        assert!(gateway.sent.lock().unwrap().is_empty());
    }
}
