//! Sync engine: pushes local note changes to the remote service.
//!
//! One cycle selects every unsynced note and, one note at a time, propagates
//! its deletion or upserts it (metadata only or with binary payloads). Remote
//! calls go through [`execute_with_retry`]; status changes go through a
//! [`TransactionCoordinator`]; progress goes through a [`ProgressCoordinator`].

mod batch;
mod config;
mod counter;
mod engine;
mod progress;
mod retry;

pub use batch::{CommitMode, SyncBatch, TransactionCoordinator};
pub use config::{SelectionOrder, SyncConfig, UpsertStrategy, DEFAULT_PROGRESS_INTERVAL};
pub use counter::SuccessCounter;
pub use engine::{CancelHandle, DroppedField, RecordFailure, SyncEngine, SyncReport, SyncRequest};
pub use progress::{ProgressCoordinator, SyncProgress};
pub use retry::{execute_with_retry, RetryPolicy};
