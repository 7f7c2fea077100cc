use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notesync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note title cannot be empty")]
    EmptyTitle,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Owner is not configured. Pass --owner or set NOTESYNC_OWNER_ID.")]
    OwnerNotConfigured,
    #[error(
        "Sync is not configured. Set NOTESYNC_API_URL and NOTESYNC_API_KEY (and optionally NOTESYNC_ACCESS_TOKEN)."
    )]
    SyncNotConfigured,
}
