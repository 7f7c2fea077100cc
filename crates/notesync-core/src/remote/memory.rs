//! In-process remote note service.
//!
//! Keeps rows in memory, records every call, and can be told to fail calls
//! for specific notes. Used by tests and local demos.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{FetchShape, RemoteError, RemoteNoteService, RemoteResult};
use crate::models::{BinaryField, NoteId, RemoteNoteRecord};

/// A call observed by [`MemoryRemoteService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Exists(NoteId),
    Insert(NoteId),
    Update(NoteId),
    Delete(NoteId),
    Upsert(NoteId),
    Fetch,
}

impl RemoteCall {
    const fn note_id(self) -> Option<NoteId> {
        match self {
            Self::Exists(id)
            | Self::Insert(id)
            | Self::Update(id)
            | Self::Delete(id)
            | Self::Upsert(id) => Some(id),
            Self::Fetch => None,
        }
    }
}

#[derive(Debug, Clone)]
struct FailurePlan {
    error: RemoteError,
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct MemoryRemoteState {
    rows: BTreeMap<(String, NoteId), RemoteNoteRecord>,
    calls: Vec<RemoteCall>,
    failures: HashMap<NoteId, FailurePlan>,
    racing_inserts: HashMap<NoteId, RemoteNoteRecord>,
}

impl MemoryRemoteState {
    fn record_call(&mut self, call: RemoteCall) -> RemoteResult<()> {
        self.calls.push(call);
        let Some(id) = call.note_id() else {
            return Ok(());
        };
        let Some(plan) = self.failures.get_mut(&id) else {
            return Ok(());
        };

        let error = plan.error.clone();
        match plan.remaining.as_mut() {
            None => Err(error),
            Some(0) => Ok(()),
            Some(remaining) => {
                *remaining -= 1;
                Err(error)
            }
        }
    }
}

/// Thread-safe in-memory implementation of [`RemoteNoteService`].
#[derive(Clone, Default)]
pub struct MemoryRemoteService {
    state: Arc<Mutex<MemoryRemoteState>>,
    atomic_upsert: bool,
}

impl MemoryRemoteService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a server-side atomic upsert.
    #[must_use]
    pub const fn with_atomic_upsert(mut self) -> Self {
        self.atomic_upsert = true;
        self
    }

    /// Fail every call touching `id` with `error`.
    pub async fn fail_always(&self, id: NoteId, error: RemoteError) {
        let mut state = self.state.lock().await;
        state.failures.insert(
            id,
            FailurePlan {
                error,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls touching `id`, then recover.
    pub async fn fail_times(&self, id: NoteId, times: u32, error: RemoteError) {
        let mut state = self.state.lock().await;
        state.failures.insert(
            id,
            FailurePlan {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Simulate another device inserting `row` right after the next
    /// existence check for its id reports it absent.
    pub async fn race_insert_after_check(&self, row: RemoteNoteRecord) {
        let mut state = self.state.lock().await;
        state.racing_inserts.insert(row.id, row);
    }

    /// Seed a row directly.
    pub async fn put_row(&self, row: RemoteNoteRecord) {
        let mut state = self.state.lock().await;
        state.rows.insert((row.owner_id.clone(), row.id), row);
    }

    pub async fn row(&self, owner_id: &str, id: NoteId) -> Option<RemoteNoteRecord> {
        let state = self.state.lock().await;
        state.rows.get(&(owner_id.to_string(), id)).cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls touching a specific note.
    pub async fn calls_for(&self, id: NoteId) -> Vec<RemoteCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .copied()
            .filter(|call| call.note_id() == Some(id))
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}

fn merge_row(existing: &mut RemoteNoteRecord, incoming: &RemoteNoteRecord) {
    let mut merged = incoming.clone();
    for field in BinaryField::ALL {
        if merged.payload(field).is_none() {
            if let Some(payload) = existing.payload(field) {
                merged.set_payload(field, payload.clone());
            }
        }
    }
    *existing = merged;
}

fn strip_binary(row: &RemoteNoteRecord) -> RemoteNoteRecord {
    let mut minimal = row.clone();
    minimal.content = None;
    minimal.ai_content = None;
    minimal.sections = None;
    minimal.mind_map = None;
    minimal.supplementary_materials = None;
    minimal
}

impl RemoteNoteService for MemoryRemoteService {
    async fn note_exists(&self, id: NoteId, owner_id: &str) -> RemoteResult<bool> {
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Exists(id))?;
        let key = (owner_id.to_string(), id);
        let exists = state.rows.contains_key(&key);

        if !exists {
            if let Some(row) = state.racing_inserts.remove(&id) {
                state.rows.insert((row.owner_id.clone(), row.id), row);
            }
        }
        Ok(exists)
    }

    async fn insert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Insert(row.id))?;
        let key = (row.owner_id.clone(), row.id);
        if state.rows.contains_key(&key) {
            return Err(RemoteError::from_status(
                409,
                format!("duplicate key value violates unique constraint on id {}", row.id),
            ));
        }
        state.rows.insert(key, row.clone());
        Ok(())
    }

    async fn update_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Update(row.id))?;
        if let Some(existing) = state.rows.get_mut(&(row.owner_id.clone(), row.id)) {
            merge_row(existing, row);
        }
        Ok(())
    }

    async fn delete_note(&self, id: NoteId, owner_id: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Delete(id))?;
        state.rows.remove(&(owner_id.to_string(), id));
        Ok(())
    }

    fn supports_atomic_upsert(&self) -> bool {
        self.atomic_upsert
    }

    async fn upsert_note(&self, row: &RemoteNoteRecord) -> RemoteResult<()> {
        if !self.atomic_upsert {
            return Err(RemoteError::Unsupported("upsert"));
        }
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Upsert(row.id))?;
        state
            .rows
            .entry((row.owner_id.clone(), row.id))
            .and_modify(|existing| merge_row(existing, row))
            .or_insert_with(|| row.clone());
        Ok(())
    }

    async fn fetch_notes(
        &self,
        owner_id: &str,
        shape: FetchShape,
    ) -> RemoteResult<Vec<RemoteNoteRecord>> {
        let mut state = self.state.lock().await;
        state.record_call(RemoteCall::Fetch)?;
        let mut rows: Vec<RemoteNoteRecord> = state
            .rows
            .values()
            .filter(|row| row.owner_id == owner_id)
            .map(|row| match shape {
                FetchShape::Minimal => strip_binary(row),
                FetchShape::Complete => row.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(rows)
    }
}
