use scanbox_client::SubmitError;
use scanbox_core::IndexError;
use scanbox_kv::KVError;
use thiserror::Error;

/// Errors from the scan session and the pending store.
///
/// Two kinds matter to callers: [`SyncError::Submission`] is recoverable by
/// keeping the batch locally, while storage failures ([`SyncError::Storage`],
/// [`SyncError::Serialization`]) have no recovery and should block the user.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("nothing to save: no codes scanned")]
    EmptyBatch,

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("submission failed: {0}")]
    Submission(#[from] SubmitError),

    #[error("local storage failed: {0}")]
    Storage(#[from] KVError),

    #[error("pending store is unreadable: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether this is a persistence failure (read/write/decode of local state).
    pub fn is_storage(&self) -> bool {
        matches!(self, SyncError::Storage(_) | SyncError::Serialization(_))
    }
}
