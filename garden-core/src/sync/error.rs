//! Sync error types.

use std::io;
use std::path::PathBuf;

use super::remote::RemoteError;
use crate::store::StoreError;

/// Errors that can occur in the offline-first sync layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No active user session. Never retried.
    #[error("Not authenticated: sign in before syncing")]
    NotAuthenticated,

    /// The remote call did not settle before its deadline.
    #[error("Remote call timed out (attempt {attempts})")]
    NetworkTimeout { attempts: u32 },

    /// The remote store returned a transport or application error.
    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(#[from] RemoteError),

    /// An expected remote record is missing.
    #[error("{collection} record not found: {id}")]
    NotFound { collection: String, id: String },

    /// A backup artifact failed validation.
    #[error("Invalid backup: {0}")]
    Validation(String),

    /// A cached value was not a well-formed record array.
    #[error("Cached collection '{key}' is corrupt")]
    StorageCorruption { key: String },

    /// The local store backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a media file failed.
    #[error("Media error for {}: {}", .0.display(), .1)]
    Media(PathBuf, #[source] io::Error),

    /// Reading or writing a backup file failed.
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),

    /// The serializer worker is gone, so the operation never ran to completion.
    #[error("Storage queue closed")]
    QueueClosed,
}

impl SyncError {
    /// Whether another attempt of the same remote call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::NetworkTimeout { .. } => true,
            SyncError::RemoteOperationFailed(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error came from the network rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::NetworkTimeout { .. } | SyncError::RemoteOperationFailed(_)
        )
    }
}
