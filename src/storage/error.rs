//! Storage client error types
//!
//! Everything the database client can report back to the pools is defined
//! here. We use `thiserror` for ergonomic error definition and messages.

use thiserror::Error;

use crate::storage::types::DbType;

/// the main error type for database client operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// uri does not follow the `<scheme>:<database>` form
    #[error("invalid database uri: {0}")]
    InvalidUri(String),

    /// the uri names a database this client does not serve
    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    /// user/password pair rejected
    #[error("authentication failed for user {user}")]
    AuthenticationFailed { user: String },

    /// connection requested from a factory that was never configured
    #[error("{0} connection factory is not configured")]
    NotConfigured(DbType),

    /// operation attempted on a closed connection
    #[error("{0} connection is closed")]
    ConnectionClosed(DbType),

    /// the storage engine refused to complete a commit or rollback
    #[error("{db_type} transaction failed: {reason}")]
    TransactionFailed { db_type: DbType, reason: String },

    /// the requested record was not found
    #[error("record not found: cluster={cluster}, id={id}")]
    RecordNotFound { cluster: String, id: String },

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// check if this error is raised while finishing a transaction
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            StorageError::TransactionFailed { .. } | StorageError::ConnectionClosed(_)
        )
    }

    /// check if this error is caused by bad connection settings
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidUri(_)
                | StorageError::UnknownDatabase(_)
                | StorageError::AuthenticationFailed { .. }
                | StorageError::NotConfigured(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
