//! The contract every pool fulfils towards the transaction manager.

use crate::storage::{Credentials, DbType, TxType};
use crate::transaction::TransactionResult;

/// A connection pool taking part in units of work.
///
/// All connection state is bound to the calling thread: `commit`,
/// `rollback` and `close_connection` act on the connection opened by the
/// current thread only, and always leave the thread without one.
pub trait PoolManager: Send + Sync + 'static {
    /// Database view served by this pool.
    fn db_type(&self) -> DbType;

    /// Configure the pool for the given database. Calling it again is a no-op.
    fn start(&self, credentials: &Credentials) -> TransactionResult<()>;

    /// Release pool resources. Fails while any thread still holds a connection.
    fn stop(&self) -> TransactionResult<()>;

    /// Commit and release the current thread's connection, if one is open.
    fn commit(&self) -> TransactionResult<()>;

    /// Roll back and release the current thread's connection, if one is open.
    fn rollback(&self) -> TransactionResult<()>;

    /// Release the current thread's connection without finishing its transaction.
    fn close_connection(&self);
}

/// A pool that hands out typed connections.
pub trait ConnectionSource: PoolManager {
    type Connection: Clone;

    /// Current thread's connection, opened with `tx_type` if there is none yet.
    fn connection(&self, tx_type: TxType) -> TransactionResult<Self::Connection>;
}
