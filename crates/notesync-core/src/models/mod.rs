//! Data models for notesync

mod note;
mod remote;

pub use note::{
    BinaryField, FolderId, NoteId, NoteRecord, ProcessingStatus, SourceKind, SyncStatus,
};
pub use remote::{EncodedPayload, RemoteNoteRecord};
