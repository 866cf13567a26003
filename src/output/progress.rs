//! Progress reporting
//!
//! Each task owns a bounded queue of [`ProgressEvent`]s drained by a dedicated
//! reporting task that forwards them to a [`ProgressSubscriber`]:
//! - Intermediate events never block the crawl; they are dropped when the queue is full
//! - The terminal event is always delivered with an awaited send
//! - The reporter stops once every sender is dropped and the queue is drained

use crate::state::{TaskState, TaskStats};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the per-task event queue
pub const PROGRESS_QUEUE_CAPACITY: usize = 64;

/// Kind of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    Completed,
    Failed,
}

impl EventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress)
    }
}

/// Status update published for one task
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub message: String,
    /// 0..=100; terminal events always carry 100
    pub progress_percent: u8,
    pub kind: EventKind,
    pub stats: TaskStats,
}

/// Receiver of progress events (push-notification transport, log, test probe, ...)
#[async_trait]
pub trait ProgressSubscriber: Send + Sync {
    async fn deliver(&self, event: ProgressEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubscriber;

#[async_trait]
impl ProgressSubscriber for LogSubscriber {
    async fn deliver(&self, event: ProgressEvent) {
        match event.kind {
            EventKind::Progress => {
                info!("[{}] {:>3}% {}", event.task_id, event.progress_percent, event.message)
            }
            EventKind::Completed => info!("[{}] {}", event.task_id, event.message),
            EventKind::Failed => warn!("[{}] {}", event.task_id, event.message),
        }
    }
}

/// Forwards events into an unbounded channel owned by an external consumer
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Creates a subscriber together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSubscriber for ChannelSubscriber {
    async fn deliver(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("Progress consumer is gone; dropping event");
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSubscriber;

#[async_trait]
impl ProgressSubscriber for NullSubscriber {
    async fn deliver(&self, _event: ProgressEvent) {}
}

/// Producer side of a task's progress queue
///
/// Every event carries a fresh copy of the task's counters.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    task_id: String,
    state: TaskState,
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    fn event(&self, kind: EventKind, message: String, percent: u8) -> ProgressEvent {
        ProgressEvent {
            task_id: self.task_id.clone(),
            message,
            progress_percent: percent.min(100),
            kind,
            stats: self.state.stats(),
        }
    }

    /// Publishes an intermediate event without ever blocking
    ///
    /// # Returns
    ///
    /// True if the event was queued, false if it was dropped
    pub fn emit(&self, message: impl Into<String>, percent: u8) -> bool {
        let event = self.event(EventKind::Progress, message.into(), percent);
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!("Progress queue full; dropping '{}'", event.message);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Publishes the terminal event, waiting for queue space if needed
    pub async fn finish(&self, kind: EventKind, message: impl Into<String>) {
        let kind = if kind.is_terminal() {
            kind
        } else {
            EventKind::Completed
        };
        let event = self.event(kind, message.into(), 100);
        if self.tx.send(event).await.is_err() {
            warn!("[{}] Reporter stopped before the terminal event", self.task_id);
        }
    }
}

/// Creates the bounded progress queue of a task
pub fn progress_channel(
    task_id: impl Into<String>,
    state: TaskState,
    capacity: usize,
) -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sender = ProgressSender {
        task_id: task_id.into(),
        state,
        tx,
    };
    (sender, rx)
}

/// Spawns the reporting loop draining `rx` into `subscriber`
///
/// The returned handle resolves to the number of delivered events once every sender has
/// been dropped and the queue is empty.
pub fn spawn_reporter(
    mut rx: mpsc::Receiver<ProgressEvent>,
    subscriber: Arc<dyn ProgressSubscriber>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(event) = rx.recv().await {
            subscriber.deliver(event).await;
            delivered += 1;
        }
        delivered
    })
}

/// Percentage of `done` out of `total`, capped at 99 until the task is finished
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.saturating_mul(100) / total).min(99)) as u8
}
