//! Transaction error types.

use thiserror::Error;

use crate::storage::{DbType, StorageError, TxType};

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur while orchestrating units of work.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Connection or boundary operation attempted outside a unit of work.
    #[error("no unit of work defined on the current thread")]
    NoUnitOfWork,

    /// The pool's connection was closed by someone else mid-transaction.
    #[error("inconsistent {pool} pool state: connection closed before commit, atomicity is lost")]
    Consistency { pool: DbType },

    /// Storage refused the commit.
    #[error("{pool} pool commit failed: {source}")]
    Commit {
        pool: DbType,
        #[source]
        source: StorageError,
    },

    /// Storage refused the rollback.
    #[error("{pool} pool rollback failed: {source}")]
    Rollback {
        pool: DbType,
        #[source]
        source: StorageError,
    },

    /// Lifecycle call made in a state that forbids it.
    #[error("misuse: {0}")]
    Misuse(String),

    /// Connection requested from a pool that was never started.
    #[error("{pool} pool is not started")]
    NotStarted { pool: DbType },

    /// Provider cannot serve the current transaction type.
    #[error("{provider} connection is not available for {actual} transactions")]
    TxTypeMismatch {
        provider: &'static str,
        actual: TxType,
    },

    /// Provider lookup for a pool type that was never registered.
    #[error("pool not registered: {0}")]
    PoolNotRegistered(&'static str),

    /// Database client error while configuring or opening connections.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TransactionError {
    /// Check if this error was raised while finishing a unit of work.
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            TransactionError::Consistency { .. }
                | TransactionError::Commit { .. }
                | TransactionError::Rollback { .. }
        )
    }

    /// Pool the error originated from, if any.
    pub fn pool(&self) -> Option<DbType> {
        match self {
            TransactionError::Consistency { pool }
            | TransactionError::Commit { pool, .. }
            | TransactionError::Rollback { pool, .. }
            | TransactionError::NotStarted { pool } => Some(*pool),
            _ => None,
        }
    }

    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_failure() {
        let commit = TransactionError::Commit {
            pool: DbType::Object,
            source: StorageError::ConnectionClosed(DbType::Object),
        };
        assert!(commit.is_completion_failure());
        assert_eq!(commit.pool(), Some(DbType::Object));

        assert!(!TransactionError::NoUnitOfWork.is_completion_failure());
        assert_eq!(TransactionError::NoUnitOfWork.pool(), None);
    }

    #[test]
    fn test_error_display() {
        let err = TransactionError::TxTypeMismatch {
            provider: "transactional graph",
            actual: TxType::NoTx,
        };
        assert_eq!(
            err.to_string(),
            "transactional graph connection is not available for NOTX transactions"
        );
    }
}
