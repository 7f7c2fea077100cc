//! Sync engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use crate::payload::{PayloadEncoding, PayloadPolicy};

/// Default minimum spacing between progress deliveries.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// How a live record is written remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// Existence check, then insert or update
    #[default]
    CheckThenAct,
    /// Single server-side upsert when the remote service supports one
    Atomic,
}

/// Order in which unsynced records are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Most recently modified first
    #[default]
    NewestFirst,
    /// Least recently modified first
    OldestFirst,
}

/// Configuration for a [`SyncEngine`](super::SyncEngine)
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub retry: RetryPolicy,
    pub payload: PayloadPolicy,
    pub progress_interval: Duration,
    pub upsert: UpsertStrategy,
    pub selection_order: SelectionOrder,
}

impl SyncConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_payload_policy(mut self, payload: PayloadPolicy) -> Self {
        self.payload = payload;
        self
    }

    /// Shorthand for switching the payload policy's encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload = self.payload.with_encoding(encoding);
        self
    }

    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_upsert_strategy(mut self, upsert: UpsertStrategy) -> Self {
        self.upsert = upsert;
        self
    }

    #[must_use]
    pub const fn with_selection_order(mut self, order: SelectionOrder) -> Self {
        self.selection_order = order;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            payload: PayloadPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            upsert: UpsertStrategy::default(),
            selection_order: SelectionOrder::default(),
        }
    }
}
