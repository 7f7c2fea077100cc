//! notesync-core - Offline-first note synchronization engine
//!
//! This crate contains the note model, the local-store and remote-service
//! collaborator traits (with in-memory and HTTP implementations), and the
//! sync engine that reconciles the two.

pub mod error;
pub mod models;
pub mod payload;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use models::{BinaryField, NoteId, NoteRecord, RemoteNoteRecord, SyncStatus};
pub use payload::{PayloadEncoding, PayloadPolicy};
pub use remote::{RemoteError, RemoteNoteService, RestConfig, RestNoteService};
pub use state::SyncState;
pub use store::{MemoryNoteStore, NoteStore, StatusChange};
pub use sync::{SyncConfig, SyncEngine, SyncProgress, SyncReport, SyncRequest};
