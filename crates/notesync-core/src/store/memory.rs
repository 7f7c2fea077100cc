//! In-memory note store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{NoteStore, StatusChange};
use crate::models::{NoteId, NoteRecord, SyncStatus};
use crate::{Error, Result};

/// Thread-safe in-memory [`NoteStore`].
///
/// Counts commits so callers can observe how often the engine saved.
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    notes: Arc<Mutex<BTreeMap<NoteId, NoteRecord>>>,
    save_calls: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryNoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with notes.
    #[must_use]
    pub fn with_notes(notes: impl IntoIterator<Item = NoteRecord>) -> Self {
        let map = notes.into_iter().map(|note| (note.id, note)).collect();
        Self {
            notes: Arc::new(Mutex::new(map)),
            ..Self::default()
        }
    }

    /// Insert or replace a note, as the note editing flow would.
    pub async fn put(&self, note: NoteRecord) {
        self.notes.lock().await.insert(note.id, note);
    }

    pub async fn get(&self, id: &NoteId) -> Option<NoteRecord> {
        self.notes.lock().await.get(id).cloned()
    }

    /// Every note, ordered by id.
    pub async fn all(&self) -> Vec<NoteRecord> {
        self.notes.lock().await.values().cloned().collect()
    }

    /// Number of `save` calls that reached the store.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl NoteStore for MemoryNoteStore {
    async fn fetch_unsynced(&self) -> Result<Vec<NoteRecord>> {
        let notes = self.notes.lock().await;
        let mut pending: Vec<NoteRecord> = notes
            .values()
            .filter(|note| note.sync_status != SyncStatus::Synced)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(pending)
    }

    async fn save(&self, changes: &[StatusChange]) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Store("save rejected by store".to_string()));
        }

        let mut notes = self.notes.lock().await;
        for change in changes {
            if let Some(note) = notes.get_mut(&change.id) {
                change.apply_to(note);
            }
        }
        Ok(())
    }

    async fn fetch_propagated_tombstones(&self) -> Result<Vec<NoteId>> {
        let notes = self.notes.lock().await;
        Ok(notes
            .values()
            .filter(|note| note.is_tombstoned() && note.sync_status == SyncStatus::Synced)
            .map(|note| note.id)
            .collect())
    }

    async fn purge(&self, ids: &[NoteId]) -> Result<usize> {
        let mut notes = self.notes.lock().await;
        Ok(ids.iter().filter(|id| notes.remove(*id).is_some()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_unsynced_orders_newest_first_and_skips_synced() {
        let mut old = NoteRecord::new("old", Vec::new());
        old.last_modified = 1_000;
        let mut new = NoteRecord::new("new", Vec::new());
        new.last_modified = 2_000;
        let mut done = NoteRecord::new("done", Vec::new());
        done.sync_status = SyncStatus::Synced;

        let store = MemoryNoteStore::with_notes([old.clone(), new.clone(), done]);
        let pending = store.fetch_unsynced().await.unwrap();

        let ids: Vec<NoteId> = pending.iter().map(|note| note.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn save_counts_calls_and_can_fail() {
        let note = NoteRecord::new("note", Vec::new());
        let store = MemoryNoteStore::with_notes([note.clone()]);
        let change = StatusChange::new(&note, SyncStatus::Synced);

        store.save(&[change]).await.unwrap();
        store.set_fail_saves(true);
        assert!(store.save(&[change]).await.is_err());

        assert_eq!(store.save_calls(), 2);
        assert_eq!(store.get(&note.id).await.unwrap().sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn save_skips_notes_changed_since_selection() {
        let mut edited = NoteRecord::new("edited", Vec::new());
        edited.last_modified = 1_000;
        let mut deleted = NoteRecord::new("deleted", Vec::new());
        deleted.last_modified = 1_000;
        let untouched = NoteRecord::new("untouched", Vec::new());
        let missing = NoteRecord::new("missing", Vec::new());
        let store =
            MemoryNoteStore::with_notes([edited.clone(), deleted.clone(), untouched.clone()]);

        let changes: Vec<StatusChange> = [&edited, &deleted, &untouched, &missing]
            .into_iter()
            .map(|note| StatusChange::new(note, SyncStatus::Synced))
            .collect();

        let mut newer = edited.clone();
        newer.last_modified = 2_000;
        store.put(newer).await;
        let mut tombstone = deleted.clone();
        tombstone.deleted_at = Some(1_000);
        store.put(tombstone).await;

        store.save(&changes).await.unwrap();

        assert_eq!(store.get(&edited.id).await.unwrap().sync_status, SyncStatus::Pending);
        let deleted = store.get(&deleted.id).await.unwrap();
        assert_eq!(deleted.sync_status, SyncStatus::Pending);
        assert_eq!(deleted.deleted_at, Some(1_000));
        assert_eq!(store.get(&untouched.id).await.unwrap().sync_status, SyncStatus::Synced);
        assert!(store.get(&missing.id).await.is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_propagated_tombstones() {
        let mut gone = NoteRecord::new("gone", Vec::new());
        gone.mark_deleted();
        gone.sync_status = SyncStatus::Synced;
        let mut waiting = NoteRecord::new("waiting", Vec::new());
        waiting.mark_deleted();

        let store = MemoryNoteStore::with_notes([gone.clone(), waiting.clone()]);
        let ids = store.fetch_propagated_tombstones().await.unwrap();
        assert_eq!(ids, vec![gone.id]);

        assert_eq!(store.purge(&ids).await.unwrap(), 1);
        assert!(store.get(&gone.id).await.is_none());
        assert!(store.get(&waiting.id).await.is_some());
    }
}
