//! Engine-level sync state exposed to UI layers.

use serde::Serialize;

/// Coarse state of a [`SyncEngine`](crate::sync::SyncEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No cycle has run, or the last one was cancelled
    #[default]
    Idle,
    Syncing,
    /// Last cycle synced and committed every selected note
    Synced,
    /// Last cycle failed or left notes unsynced
    Error,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
