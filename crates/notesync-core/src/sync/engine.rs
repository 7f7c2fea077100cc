//! Sync orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::batch::{CommitMode, TransactionCoordinator};
use super::config::{SelectionOrder, SyncConfig, UpsertStrategy};
use super::counter::SuccessCounter;
use super::progress::{ProgressCoordinator, SyncProgress};
use super::retry::execute_with_retry;
use crate::models::{BinaryField, NoteId, NoteRecord, RemoteNoteRecord, SyncStatus};
use crate::remote::RemoteError;
use crate::remote::RemoteNoteService;
use crate::state::SyncState;
use crate::store::NoteStore;
use crate::{Error, Result};

/// Parameters of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub owner_id: String,
    /// Send binary fields (full sync) instead of metadata only.
    pub include_binary_data: bool,
    pub commit_mode: CommitMode,
}

impl SyncRequest {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            include_binary_data: false,
            commit_mode: CommitMode::default(),
        }
    }

    #[must_use]
    pub const fn with_binary_data(mut self, include: bool) -> Self {
        self.include_binary_data = include;
        self
    }

    #[must_use]
    pub const fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }
}

/// A record that did not sync in this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub note_id: NoteId,
    pub title: String,
    pub error: String,
}

impl RecordFailure {
    fn new(record: &NoteRecord, error: &Error) -> Self {
        Self {
            note_id: record.id,
            title: record.title.clone(),
            error: error.to_string(),
        }
    }
}

/// An optional field left out of a record's remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedField {
    pub note_id: NoteId,
    pub field: BinaryField,
}

/// Outcome of a sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records selected for this cycle
    pub total: usize,
    /// Records that reached the remote side, deletions included
    pub synced: usize,
    /// Of `synced`, how many were tombstone deletions
    pub deleted: usize,
    pub failures: Vec<RecordFailure>,
    pub dropped_fields: Vec<DroppedField>,
    pub cancelled: bool,
    /// Set when the deferred batch could not be committed locally
    pub commit_error: Option<String>,
}

impl SyncReport {
    /// True when at least one record synced.
    #[must_use]
    pub const fn any_synced(&self) -> bool {
        self.synced > 0
    }

    /// True when every selected record synced and was committed locally.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled
            && self.commit_error.is_none()
            && self.failures.is_empty()
            && self.synced == self.total
    }
}

/// Clonable handle that asks a running cycle to stop between records.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag))
            .map_err(|_| Error::SyncInProgress)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct RecordOutcome {
    deleted: bool,
    dropped: Vec<BinaryField>,
}

/// Status to record for a failed note. `None` leaves it pending.
const fn failure_status(error: &Error) -> Option<SyncStatus> {
    match error {
        Error::PayloadTooLarge { .. } => Some(SyncStatus::Failed),
        Error::Remote {
            source: RemoteError::Conflict(_),
            ..
        } => Some(SyncStatus::Conflict),
        _ => None,
    }
}

fn describe(record: &NoteRecord) -> String {
    format!("'{}' ({})", record.display_title(), record.id)
}

/// Pushes local changes to the remote note service.
pub struct SyncEngine<S, R> {
    store: S,
    remote: R,
    config: SyncConfig,
    running: AtomicBool,
    cancel: CancelHandle,
    state: watch::Sender<SyncState>,
}

impl<S: NoteStore, R: RemoteNoteService> SyncEngine<S, R> {
    pub fn new(store: S, remote: R, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            store,
            remote,
            config,
            running: AtomicBool::new(false),
            cancel: CancelHandle::default(),
            state,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Run one sync cycle over every unsynced record.
    ///
    /// Per-record failures are collected in the report. Only a failure to
    /// select records (or a concurrent cycle) is returned as an error.
    pub async fn run_sync_cycle<F>(&self, request: &SyncRequest, on_progress: F) -> Result<SyncReport>
    where
        F: FnMut(SyncProgress) + Send + 'static,
    {
        if request.owner_id.trim().is_empty() {
            return Err(Error::InvalidInput("owner id must not be empty".to_string()));
        }

        let _running = RunningGuard::acquire(&self.running)?;
        self.cancel.reset();
        self.state.send_replace(SyncState::Syncing);

        let mut records = match self.store.fetch_unsynced().await {
            Ok(records) => records,
            Err(error) => {
                tracing::error!("Failed to select unsynced notes: {error}");
                self.state.send_replace(SyncState::Error);
                return Err(error);
            }
        };
        match self.config.selection_order {
            SelectionOrder::NewestFirst => {
                records.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
            }
            SelectionOrder::OldestFirst => records.sort_by_key(|record| record.last_modified),
        }

        let total = records.len();
        tracing::info!(
            total,
            include_binary = request.include_binary_data,
            commit_mode = ?request.commit_mode,
            "Starting sync cycle"
        );

        let progress = ProgressCoordinator::spawn(self.config.progress_interval, on_progress);
        progress.schedule(SyncProgress::new(
            total,
            0,
            format!("Preparing to sync {total} notes"),
        ));

        let counter = SuccessCounter::new();
        let mut transaction = TransactionCoordinator::new(&self.store, request.commit_mode);
        let mut report = SyncReport {
            total,
            ..SyncReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = index, total, "Sync cycle cancelled");
                report.cancelled = true;
                break;
            }

            match self.sync_record(record, request).await {
                Ok(outcome) => match transaction.mark_synced(record).await {
                    Ok(()) => {
                        counter.increment();
                        if outcome.deleted {
                            report.deleted += 1;
                        }
                        report
                            .dropped_fields
                            .extend(outcome.dropped.into_iter().map(|field| DroppedField {
                                note_id: record.id,
                                field,
                            }));
                    }
                    Err(error) => {
                        tracing::warn!(
                            note_id = %record.id,
                            "Synced note {} but could not save its status: {error}",
                            describe(record)
                        );
                        report.failures.push(RecordFailure::new(record, &error));
                    }
                },
                Err(error) => {
                    tracing::warn!(note_id = %record.id, "Failed to sync note {}: {error}", describe(record));
                    if let Some(status) = failure_status(&error) {
                        if let Err(save_error) = transaction.mark(record, status).await {
                            tracing::warn!(
                                note_id = %record.id,
                                "Could not mark note as {}: {save_error}",
                                status.as_str()
                            );
                        }
                    }
                    report.failures.push(RecordFailure::new(record, &error));
                }
            }

            progress.schedule(SyncProgress::new(
                total,
                counter.count(),
                format!("Syncing note {} of {total}", index + 1),
            ));
        }

        match transaction.finish().await {
            Ok(0) => {}
            Ok(committed) => tracing::debug!(committed, "Committed sync batch"),
            Err(error) => {
                tracing::error!("Failed to commit sync batch: {error}");
                report.commit_error = Some(error.to_string());
            }
        }

        report.synced = counter.count();
        let status = if report.cancelled {
            format!("Sync cancelled: {} of {total} notes synced", report.synced)
        } else {
            format!("Sync complete: {} of {total} notes synced", report.synced)
        };
        progress
            .finish(SyncProgress::new(total, report.synced, status))
            .await;

        tracing::info!(
            total,
            synced = report.synced,
            deleted = report.deleted,
            failed = report.failures.len(),
            dropped_fields = report.dropped_fields.len(),
            cancelled = report.cancelled,
            "Sync cycle finished"
        );

        let final_state = if report.cancelled {
            SyncState::Idle
        } else if report.is_complete() {
            SyncState::Synced
        } else {
            SyncState::Error
        };
        self.state.send_replace(final_state);

        Ok(report)
    }

    /// Hard-delete local tombstones whose deletion has reached the remote.
    pub async fn purge_propagated_tombstones(&self) -> Result<usize> {
        let _running = RunningGuard::acquire(&self.running)?;

        let ids = self.store.fetch_propagated_tombstones().await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let purged = self.store.purge(&ids).await?;
        tracing::info!(purged, "Purged propagated tombstones");
        Ok(purged)
    }

    async fn sync_record(&self, record: &NoteRecord, request: &SyncRequest) -> Result<RecordOutcome> {
        let owner_id = request.owner_id.as_str();

        if record.is_tombstoned() {
            tracing::debug!(note_id = %record.id, "Propagating deletion");
            self.delete_remote(record, owner_id).await?;
            return Ok(RecordOutcome {
                deleted: true,
                dropped: Vec::new(),
            });
        }

        let mut row = RemoteNoteRecord::metadata(record, owner_id);
        let dropped = if request.include_binary_data {
            tracing::debug!(note_id = %record.id, "Full sync");
            self.config.payload.prepare(record)?.attach_to(&mut row)
        } else {
            tracing::debug!(note_id = %record.id, "Metadata-only sync");
            Vec::new()
        };

        self.upsert_remote(record, &row).await?;
        Ok(RecordOutcome {
            deleted: false,
            dropped,
        })
    }

    async fn delete_remote(&self, record: &NoteRecord, owner_id: &str) -> Result<()> {
        let remote = &self.remote;
        let id = record.id;
        execute_with_retry(
            &self.config.retry,
            &format!("delete note {}", describe(record)),
            move || remote.delete_note(id, owner_id),
        )
        .await
    }

    async fn upsert_remote(&self, record: &NoteRecord, row: &RemoteNoteRecord) -> Result<()> {
        let remote = &self.remote;
        let retry = &self.config.retry;
        let label = describe(record);

        if self.config.upsert == UpsertStrategy::Atomic && remote.supports_atomic_upsert() {
            return execute_with_retry(retry, &format!("upsert note {label}"), move || {
                remote.upsert_note(row)
            })
            .await;
        }

        // Check-then-act is not atomic. Another writer can insert the row
        // after the check reports it absent (our insert then hits a
        // duplicate-key conflict and the record is marked conflict), or
        // delete it before our update lands (the update matches nothing).
        let id = row.id;
        let owner_id = row.owner_id.as_str();
        let exists = execute_with_retry(retry, &format!("check note {label}"), move || {
            remote.note_exists(id, owner_id)
        })
        .await?;

        if exists {
            execute_with_retry(retry, &format!("update note {label}"), move || {
                remote.update_note(row)
            })
            .await
        } else {
            execute_with_retry(retry, &format!("insert note {label}"), move || {
                remote.insert_note(row)
            })
            .await
        }
    }
}
