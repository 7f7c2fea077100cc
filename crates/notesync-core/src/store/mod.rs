//! Local note store collaborator.
//!
//! The query layer of the local database lives outside this crate. The
//! engine only needs to select unsynced notes, commit status changes, and
//! purge tombstones whose deletion has reached the remote side.

mod memory;

use std::future::Future;

use crate::models::{NoteId, NoteRecord, SyncStatus};
use crate::Result;

pub use memory::MemoryNoteStore;

/// A sync status update for one note, pinned to the version the engine read.
///
/// Stores apply it only while the note is still that version. A note edited
/// or tombstoned during the cycle keeps its newer state and is selected
/// again next time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub id: NoteId,
    pub status: SyncStatus,
    /// `last_modified` of the note when it was selected
    pub seen_modified: i64,
    /// `deleted_at` of the note when it was selected
    pub seen_deleted_at: Option<i64>,
}

impl StatusChange {
    #[must_use]
    pub const fn new(record: &NoteRecord, status: SyncStatus) -> Self {
        Self {
            id: record.id,
            status,
            seen_modified: record.last_modified,
            seen_deleted_at: record.deleted_at,
        }
    }

    /// True while `note` is the version this change was computed from.
    #[must_use]
    pub fn is_current(&self, note: &NoteRecord) -> bool {
        note.id == self.id
            && note.last_modified == self.seen_modified
            && note.deleted_at == self.seen_deleted_at
    }

    /// Set the status on `note` if it is still current. Returns whether the
    /// change was applied.
    pub fn apply_to(&self, note: &mut NoteRecord) -> bool {
        if !self.is_current(note) {
            tracing::debug!(
                note_id = %self.id,
                "Note changed during sync; keeping its newer state"
            );
            return false;
        }
        note.sync_status = self.status;
        true
    }
}

/// Persistence operations the sync engine relies on.
pub trait NoteStore: Send + Sync {
    /// Notes whose status is not `synced`, tombstones included, ordered by
    /// `last_modified` descending.
    fn fetch_unsynced(&self) -> impl Future<Output = Result<Vec<NoteRecord>>> + Send;

    /// Apply status changes in one commit. Changes whose note is missing or
    /// no longer current are skipped; see [`StatusChange::apply_to`].
    fn save(&self, changes: &[StatusChange]) -> impl Future<Output = Result<()>> + Send;

    /// Ids of tombstoned notes whose deletion has been propagated.
    fn fetch_propagated_tombstones(&self) -> impl Future<Output = Result<Vec<NoteId>>> + Send;

    /// Hard-delete notes. Returns how many were removed.
    fn purge(&self, ids: &[NoteId]) -> impl Future<Output = Result<usize>> + Send;
}
