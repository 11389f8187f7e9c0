//! Error types for catalogue syncing

use thiserror::Error;

/// Errors that can occur while mirroring a remote catalogue
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or blank API key, unreadable config file
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Neither or both of username / channel id were supplied
    #[error("Configure exactly one of username or channel id ({0})")]
    SelectorConflict(String),

    /// Transport failure or non-2xx response
    #[error("Remote unavailable ({endpoint}): {reason}")]
    RemoteUnavailable { endpoint: String, reason: String },

    /// The remote answered but reported nothing matching
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Response body did not match the expected shape
    #[error("Failed to decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub(crate) fn storage(e: impl std::fmt::Display) -> Self {
        SyncError::Storage(e.to_string())
    }
}

impl From<redb::TransactionError> for SyncError {
    fn from(e: redb::TransactionError) -> Self {
        SyncError::storage(e)
    }
}

impl From<redb::TableError> for SyncError {
    fn from(e: redb::TableError) -> Self {
        SyncError::storage(e)
    }
}

impl From<redb::StorageError> for SyncError {
    fn from(e: redb::StorageError) -> Self {
        SyncError::storage(e)
    }
}

impl From<redb::CommitError> for SyncError {
    fn from(e: redb::CommitError) -> Self {
        SyncError::storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::RemoteUnavailable {
            endpoint: "channels".to_string(),
            reason: "status 503".to_string(),
        };
        assert_eq!(err.to_string(), "Remote unavailable (channels): status 503");
    }

    #[test]
    fn test_storage_helper() {
        let err = SyncError::storage("disk full");
        assert!(matches!(err, SyncError::Storage(ref m) if m == "disk full"));
    }
}
