use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::domain::ParcelId;
use super::evaluation::ConsolidationDecision;

/// Audit entry for one decision, shadow or live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub parcel_id: ParcelId,
    pub decision: ConsolidationDecision,
    pub shadow_mode: bool,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn summary(&self) -> String {
        let mode = if self.shadow_mode { "shadow" } else { "live" };
        format!(
            "[{mode}] {} {}: {}",
            self.parcel_id.0,
            self.decision.outcome_label(),
            self.decision.explanation()
        )
    }
}

/// Durable store for decision records (the audit collaborator).
pub trait DecisionAuditLog: Send + Sync {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError>;
    fn history(&self, parcel_id: &ParcelId) -> Result<Vec<DecisionRecord>, AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),
    #[error("audit log rejected record: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("decision recorder queue is full")]
    QueueFull,
    #[error("decision recorder has shut down")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1_024,
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
        }
    }
}

/// Fire-and-forget handle onto the background recording task.
///
/// The worker exits once every clone has been dropped and the backlog is written.
#[derive(Debug, Clone)]
pub struct DecisionRecorder {
    sender: mpsc::Sender<DecisionRecord>,
}

impl DecisionRecorder {
    /// Spawn the recording worker on the current tokio runtime.
    pub fn spawn<L>(log: Arc<L>, settings: RecorderSettings) -> (Self, JoinHandle<()>)
    where
        L: DecisionAuditLog + 'static,
    {
        let capacity = settings.queue_capacity.clamp(1, Semaphore::MAX_PERMITS);
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(drain(log, receiver, settings));
        (Self { sender }, handle)
    }

    /// Enqueue without waiting. Never blocks the caller on audit latency.
    pub fn record(
        &self,
        parcel_id: ParcelId,
        decision: ConsolidationDecision,
        shadow_mode: bool,
    ) -> Result<(), RecorderError> {
        let record = DecisionRecord {
            parcel_id,
            decision,
            shadow_mode,
            recorded_at: Utc::now(),
        };

        self.sender.try_send(record).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => RecorderError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RecorderError::Closed,
        })
    }
}

async fn drain<L>(
    log: Arc<L>,
    mut receiver: mpsc::Receiver<DecisionRecord>,
    settings: RecorderSettings,
) where
    L: DecisionAuditLog + 'static,
{
    while let Some(record) = receiver.recv().await {
        persist(log.as_ref(), record, &settings).await;
    }
}

async fn persist<L>(log: &L, record: DecisionRecord, settings: &RecorderSettings)
where
    L: DecisionAuditLog + ?Sized,
{
    let mut backoff = settings.initial_backoff;
    let mut attempt = 0;

    loop {
        match log.record(record.clone()) {
            Ok(()) => return,
            Err(err) if attempt < settings.max_retries => {
                attempt += 1;
                warn!(
                    parcel = %record.parcel_id.0,
                    attempt,
                    error = %err,
                    "decision record write failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(err) => {
                error!(
                    parcel = %record.parcel_id.0,
                    outcome = record.decision.outcome_label(),
                    shadow_mode = record.shadow_mode,
                    error = %err,
                    "dropping decision record after exhausting retries"
                );
                return;
            }
        }
    }
}
