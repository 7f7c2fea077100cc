//! Error types for notesync-core

use thiserror::Error;

use crate::models::BinaryField;
use crate::remote::RemoteError;

/// Result type alias using notesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store error
    #[error("Local store error: {0}")]
    Store(String),

    /// Remote operation failed after the retry budget was spent (or was fatal)
    #[error("Remote operation '{operation}' failed after {attempts} attempt(s): {source}")]
    Remote {
        /// Human-readable, per-record operation name
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Last error reported by the remote service
        #[source]
        source: RemoteError,
    },

    /// A mandatory binary field exceeds the payload cap
    #[error("{field} payload is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge {
        /// Field that overflowed
        field: BinaryField,
        /// Raw size of the field
        size: usize,
        /// Effective raw limit under the active encoding
        limit: usize,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another sync cycle is already running on this engine
    #[error("A sync cycle is already in progress")]
    SyncInProgress,
}

impl Error {
    /// Returns the remote error behind this error, if any.
    pub const fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}
