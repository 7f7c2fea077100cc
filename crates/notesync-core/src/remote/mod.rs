//! Remote note service collaborator.
//!
//! The sync engine talks to a single logical notes collection through
//! [`RemoteNoteService`]. Errors are classified as retryable or fatal so the
//! network recovery wrapper knows when to back off and try again.

mod memory;
mod rest;

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::models::{NoteId, RemoteNoteRecord};

pub use memory::{MemoryRemoteService, RemoteCall};
pub use rest::{RestConfig, RestNoteService};

/// Errors reported by a remote note service
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network-level failure (timeout, reset, DNS)
    #[error("transport error: {message}")]
    Transport {
        /// Error message
        message: String,
        /// Whether the operation can be retried
        retryable: bool,
    },

    /// Credentials missing, expired, or not allowed to touch the row
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service rejected the payload
    #[error("validation failed: {0}")]
    Validation(String),

    /// The write collided with a row another writer created (HTTP 409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success HTTP status
    #[error("remote returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response
        message: String,
    },

    /// The response body could not be decoded
    #[error("invalid response payload: {0}")]
    Decode(String),

    /// The service does not implement this operation
    #[error("operation not supported by remote service: {0}")]
    Unsupported(&'static str),
}

impl RemoteError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized(message),
            409 => Self::Conflict(message),
            400 | 404 | 413 | 422 => Self::Validation(message),
            _ => Self::Status { status, message },
        }
    }

    /// Returns true if this error can be retried.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Unauthorized(_)
            | Self::Validation(_)
            | Self::Conflict(_)
            | Self::Decode(_)
            | Self::Unsupported(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_status(status.as_u16(), error.to_string());
        }
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        if error.is_builder() {
            return Self::transport_fatal(error.to_string());
        }
        // Timeouts, connect failures and truncated bodies are transient.
        Self::transport_retryable(error.to_string())
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Column set requested by a pull-direction fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchShape {
    /// Scalar and text columns only
    #[default]
    Minimal,
    /// Every column, binary payloads included
    Complete,
}

/// Remote side of the sync: one logical notes collection scoped by owner.
pub trait RemoteNoteService: Send + Sync {
    /// Whether a row with this id exists under the owner's scope.
    fn note_exists(
        &self,
        id: NoteId,
        owner_id: &str,
    ) -> impl Future<Output = RemoteResult<bool>> + Send;

    /// Insert a new row.
    fn insert_note(&self, row: &RemoteNoteRecord) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Update an existing row by id. Binary columns absent from `row` are left untouched.
    fn update_note(&self, row: &RemoteNoteRecord) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Delete a row. Deleting a missing row succeeds.
    fn delete_note(
        &self,
        id: NoteId,
        owner_id: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Whether [`RemoteNoteService::upsert_note`] is an atomic server-side upsert.
    fn supports_atomic_upsert(&self) -> bool {
        false
    }

    /// Insert-or-update in a single request.
    fn upsert_note(&self, row: &RemoteNoteRecord) -> impl Future<Output = RemoteResult<()>> + Send {
        let _ = row;
        async { Err(RemoteError::Unsupported("upsert")) }
    }

    /// Pull-direction fetch of every row the owner holds.
    fn fetch_notes(
        &self,
        owner_id: &str,
        shape: FetchShape,
    ) -> impl Future<Output = RemoteResult<Vec<RemoteNoteRecord>>> + Send;
}

/// Source of the bearer token attached to remote requests.
///
/// Authentication flows live outside the engine; this is the seam they plug into.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> impl Future<Output = RemoteResult<String>> + Send;
}

/// Fixed bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticCredentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> RemoteResult<String> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(RemoteError::Unauthorized(
                "access token must not be empty".to_string(),
            ));
        }
        Ok(token.to_string())
    }
}
