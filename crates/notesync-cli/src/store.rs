//! Note store persisted as a single JSON file.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notesync_core::models::{NoteId, NoteRecord, SyncStatus};
use notesync_core::store::{NoteStore, StatusChange};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    notes: Vec<NoteRecord>,
}

/// [`NoteStore`] backed by a JSON file.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFileNoteStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every note, newest first.
    pub async fn load(&self) -> notesync_core::Result<Vec<NoteRecord>> {
        let _guard = self.lock.lock().await;
        let mut notes: Vec<NoteRecord> = self.read_notes().await?.into_values().collect();
        notes.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(notes)
    }

    /// Insert or replace a single note.
    pub async fn put(&self, note: NoteRecord) -> notesync_core::Result<()> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_notes().await?;
        notes.insert(note.id, note);
        self.write_notes(&notes).await
    }

    async fn read_notes(&self) -> notesync_core::Result<BTreeMap<NoteId, NoteRecord>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(error) => return Err(error.into()),
        };

        let file: StoreFile = serde_json::from_slice(&raw)?;
        if file.version != STORE_VERSION {
            return Err(notesync_core::Error::Store(format!(
                "unsupported store version {} in {}",
                file.version,
                self.path.display()
            )));
        }
        Ok(file.notes.into_iter().map(|note| (note.id, note)).collect())
    }

    async fn write_notes(&self, notes: &BTreeMap<NoteId, NoteRecord>) -> notesync_core::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = StoreFile {
            version: STORE_VERSION,
            notes: notes.values().cloned().collect(),
        };
        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, serde_json::to_vec(&file)?).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl NoteStore for JsonFileNoteStore {
    async fn fetch_unsynced(&self) -> notesync_core::Result<Vec<NoteRecord>> {
        let notes = self.load().await?;
        Ok(notes
            .into_iter()
            .filter(|note| note.sync_status != SyncStatus::Synced)
            .collect())
    }

    async fn save(&self, changes: &[StatusChange]) -> notesync_core::Result<()> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_notes().await?;
        let mut applied = 0;
        for change in changes {
            if let Some(note) = notes.get_mut(&change.id) {
                if change.apply_to(note) {
                    applied += 1;
                }
            }
        }
        if applied > 0 {
            self.write_notes(&notes).await?;
        }
        Ok(())
    }

    async fn fetch_propagated_tombstones(&self) -> notesync_core::Result<Vec<NoteId>> {
        let notes = self.load().await?;
        Ok(notes
            .iter()
            .filter(|note| note.is_tombstoned() && note.sync_status == SyncStatus::Synced)
            .map(|note| note.id)
            .collect())
    }

    async fn purge(&self, ids: &[NoteId]) -> notesync_core::Result<usize> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_notes().await?;
        let purged = ids.iter().filter(|id| notes.remove(*id).is_some()).count();
        if purged > 0 {
            self.write_notes(&notes).await?;
        }
        Ok(purged)
    }
}
