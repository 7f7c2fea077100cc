#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notesync_core::models::{NoteId, NoteRecord, RemoteNoteRecord, SyncStatus};
use notesync_core::remote::{FetchShape, MemoryRemoteService, RemoteNoteService, RemoteResult};
use notesync_core::store::{MemoryNoteStore, NoteStore, StatusChange};
use notesync_core::sync::{CancelHandle, RetryPolicy, SyncConfig, SyncProgress};
use notesync_core::{Error, Result};

pub const OWNER: &str = "owner-1";

/// Retries with short delays and unthrottled progress.
pub fn fast_config() -> SyncConfig {
    SyncConfig::new()
        .with_retry(
            RetryPolicy::new(3)
                .with_initial_delay(Duration::from_millis(5))
                .without_jitter(),
        )
        .with_progress_interval(Duration::ZERO)
}

/// A pending note with a fixed modification time.
pub fn note(title: &str, last_modified: i64) -> NoteRecord {
    let mut note = NoteRecord::new(title, format!("{title} body").into_bytes());
    note.created_at = last_modified;
    note.last_modified = last_modified;
    note
}

pub fn synced(mut note: NoteRecord) -> NoteRecord {
    note.sync_status = SyncStatus::Synced;
    note
}

pub fn tombstoned(mut note: NoteRecord) -> NoteRecord {
    let last_modified = note.last_modified;
    note.mark_deleted();
    note.last_modified = last_modified;
    note.deleted_at = Some(last_modified);
    note
}

pub fn remote_row(note: &NoteRecord) -> RemoteNoteRecord {
    RemoteNoteRecord::metadata(note, OWNER)
}

pub type ProgressLog = Arc<Mutex<Vec<SyncProgress>>>;

pub fn progress_recorder() -> (ProgressLog, impl FnMut(SyncProgress) + Send + 'static) {
    let log: ProgressLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |progress| sink.lock().unwrap().push(progress))
}

pub fn synced_counts(log: &ProgressLog) -> Vec<usize> {
    log.lock()
        .unwrap()
        .iter()
        .map(|progress| progress.synced_notes)
        .collect()
}

/// Store wrapper that records the size of every save.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryNoteStore,
    saves: Arc<Mutex<Vec<Vec<NoteId>>>>,
    fail_fetch: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn with_notes(notes: impl IntoIterator<Item = NoteRecord>) -> Self {
        Self {
            inner: MemoryNoteStore::with_notes(notes),
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<Vec<NoteId>> {
        self.saves.lock().unwrap().clone()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

impl NoteStore for RecordingStore {
    async fn fetch_unsynced(&self) -> Result<Vec<NoteRecord>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Store("database is locked".to_string()));
        }
        self.inner.fetch_unsynced().await
    }

    async fn save(&self, changes: &[StatusChange]) -> Result<()> {
        self.saves
            .lock()
            .unwrap()
            .push(changes.iter().map(|change| change.id).collect());
        self.inner.save(changes).await
    }

    async fn fetch_propagated_tombstones(&self) -> Result<Vec<NoteId>> {
        self.inner.fetch_propagated_tombstones().await
    }

    async fn purge(&self, ids: &[NoteId]) -> Result<usize> {
        self.inner.purge(ids).await
    }
}

/// Remote wrapper that requests cancellation after its first successful
/// insert.
#[derive(Clone, Default)]
pub struct CancellingRemote {
    pub inner: MemoryRemoteService,
    handle: Arc<Mutex<Option<CancelHandle>>>,
}

impl CancellingRemote {
    pub fn arm(&self, handle: CancelHandle) {
        *self.handle.lock().unwrap() = Some(handle);
    }
}

impl RemoteNoteService for CancellingRemote {
    async fn note_exists(&self, id: NoteId, owner_id: &str) -> RemoteResult<bool> {
        self.inner.note_exists(id, owner_id).await
    }

    async fn insert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        self.inner.insert_note(row).await?;
        let handle = self.handle.lock().unwrap().clone();
        if let Some(handle) = handle {
            handle.cancel();
        }
        Ok(())
    }

    async fn update_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        self.inner.update_note(row).await
    }

    async fn delete_note(&self, id: NoteId, owner_id: &str) -> RemoteResult<()> {
        self.inner.delete_note(id, owner_id).await
    }

    async fn fetch_notes(
        &self,
        owner_id: &str,
        shape: FetchShape,
    ) -> RemoteResult<Vec<RemoteNoteRecord>> {
        self.inner.fetch_notes(owner_id, shape).await
    }
}

/// Remote wrapper that tombstones a note in the local store right after its
/// row is written, as a user deleting the note mid-cycle would.
#[derive(Clone)]
pub struct DeletingRemote {
    pub inner: MemoryRemoteService,
    store: MemoryNoteStore,
    target: NoteId,
}

impl DeletingRemote {
    pub fn new(store: MemoryNoteStore, target: NoteId) -> Self {
        Self {
            inner: MemoryRemoteService::new(),
            store,
            target,
        }
    }
}

impl RemoteNoteService for DeletingRemote {
    async fn note_exists(&self, id: NoteId, owner_id: &str) -> RemoteResult<bool> {
        self.inner.note_exists(id, owner_id).await
    }

    async fn insert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        self.inner.insert_note(row).await?;
        if row.id == self.target {
            if let Some(mut note) = self.store.get(&row.id).await {
                note.mark_deleted();
                self.store.put(note).await;
            }
        }
        Ok(())
    }

    async fn update_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        self.inner.update_note(row).await
    }

    async fn delete_note(&self, id: NoteId, owner_id: &str) -> RemoteResult<()> {
        self.inner.delete_note(id, owner_id).await
    }

    async fn fetch_notes(
        &self,
        owner_id: &str,
        shape: FetchShape,
    ) -> RemoteResult<Vec<RemoteNoteRecord>> {
        self.inner.fetch_notes(owner_id, shape).await
    }
}
