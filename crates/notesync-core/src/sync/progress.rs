//! Throttled progress delivery.
//!
//! The sync loop can produce a snapshot per record. Callers only need a
//! bounded stream of them, so snapshots go through a channel to a task that
//! delivers at most one per interval and always delivers the last one.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Snapshot of a running sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub total_notes: usize,
    pub synced_notes: usize,
    pub current_status: String,
}

impl SyncProgress {
    pub fn new(total_notes: usize, synced_notes: usize, current_status: impl Into<String>) -> Self {
        Self {
            total_notes,
            synced_notes,
            current_status: current_status.into(),
        }
    }
}

/// Coalesces progress snapshots onto a throttled delivery task.
#[derive(Debug)]
pub struct ProgressCoordinator {
    sender: mpsc::UnboundedSender<SyncProgress>,
    task: JoinHandle<()>,
}

impl ProgressCoordinator {
    /// Start the delivery task. `callback` runs on that task, never on the
    /// caller's.
    pub fn spawn<F>(interval: Duration, callback: F) -> Self
    where
        F: FnMut(SyncProgress) + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver_throttled(receiver, interval, callback));
        Self { sender, task }
    }

    /// Queue a snapshot. Never blocks.
    pub fn schedule(&self, progress: SyncProgress) {
        if self.sender.send(progress).is_err() {
            tracing::debug!("Progress delivery task has stopped; dropping update");
        }
    }

    /// Queue the terminal snapshot and wait until it has been delivered.
    pub async fn finish(self, progress: SyncProgress) {
        self.schedule(progress);
        drop(self.sender);
        if let Err(error) = self.task.await {
            tracing::warn!("Progress callback task failed: {error}");
        }
    }
}

async fn deliver_throttled<F>(
    mut receiver: mpsc::UnboundedReceiver<SyncProgress>,
    interval: Duration,
    mut callback: F,
) where
    F: FnMut(SyncProgress),
{
    let mut last_delivery: Option<Instant> = None;
    let mut pending: Option<SyncProgress> = None;

    loop {
        let received = match (pending.is_some(), last_delivery) {
            (true, Some(last)) => {
                match tokio::time::timeout_at(last + interval, receiver.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        if let Some(update) = pending.take() {
                            callback(update);
                            last_delivery = Some(Instant::now());
                        }
                        continue;
                    }
                }
            }
            _ => receiver.recv().await,
        };

        let Some(update) = received else {
            if let Some(update) = pending.take() {
                callback(update);
            }
            return;
        };

        let window_open = last_delivery.is_some_and(|last| last.elapsed() < interval);
        if window_open {
            pending = Some(update);
        } else {
            callback(update);
            last_delivery = Some(Instant::now());
            pending = None;
        }
    }
}
