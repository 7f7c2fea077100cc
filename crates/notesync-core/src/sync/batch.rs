//! Transaction coordinator: immediate or deferred local commits.

use std::slice;

use serde::{Deserialize, Serialize};

use crate::models::{NoteRecord, SyncStatus};
use crate::store::{NoteStore, StatusChange};
use crate::Result;

/// When status changes reach the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// Save each record as soon as its status changes
    Immediate,
    /// Stage status changes and save them in one commit at the end of the cycle
    #[default]
    Batched,
}

/// Status changes staged for a single commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncBatch {
    open: bool,
    staged: Vec<StatusChange>,
}

impl SyncBatch {
    /// A batch that accepts staged records.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            open: true,
            staged: Vec::new(),
        }
    }

    /// A batch that accepts nothing; every change is saved immediately.
    #[must_use]
    pub const fn closed() -> Self {
        Self {
            open: false,
            staged: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Stage a status change, replacing any earlier one for the same note.
    pub fn stage(&mut self, change: StatusChange) {
        match self.staged.iter_mut().find(|staged| staged.id == change.id) {
            Some(existing) => *existing = change,
            None => self.staged.push(change),
        }
    }

    #[must_use]
    pub fn staged(&self) -> &[StatusChange] {
        &self.staged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Save every staged change in one call and close the batch.
    ///
    /// On failure the staged records are kept and the batch stays open.
    pub async fn commit<S: NoteStore>(&mut self, store: &S) -> Result<usize> {
        let count = self.staged.len();
        if count > 0 {
            store.save(&self.staged).await?;
            self.staged.clear();
        }
        self.open = false;
        Ok(count)
    }
}

/// Routes status changes either straight to the store or into a batch.
pub struct TransactionCoordinator<'a, S> {
    store: &'a S,
    batch: SyncBatch,
}

impl<'a, S: NoteStore> TransactionCoordinator<'a, S> {
    pub const fn new(store: &'a S, mode: CommitMode) -> Self {
        let batch = match mode {
            CommitMode::Immediate => SyncBatch::closed(),
            CommitMode::Batched => SyncBatch::open(),
        };
        Self { store, batch }
    }

    #[must_use]
    pub const fn batch(&self) -> &SyncBatch {
        &self.batch
    }

    pub async fn mark_synced(&mut self, record: &NoteRecord) -> Result<()> {
        self.mark(record, SyncStatus::Synced).await
    }

    pub async fn mark_failed(&mut self, record: &NoteRecord) -> Result<()> {
        self.mark(record, SyncStatus::Failed).await
    }

    /// Record a status change against the version of `record` that was
    /// synced. Saves immediately when no batch is open.
    pub async fn mark(&mut self, record: &NoteRecord, status: SyncStatus) -> Result<()> {
        let change = StatusChange::new(record, status);

        if self.batch.is_open() {
            self.batch.stage(change);
            Ok(())
        } else {
            self.store.save(slice::from_ref(&change)).await
        }
    }

    /// Commit whatever the batch holds. Returns the number of records saved
    /// by this call.
    pub async fn finish(mut self) -> Result<usize> {
        if self.batch.is_open() {
            self.batch.commit(self.store).await
        } else {
            Ok(0)
        }
    }
}
