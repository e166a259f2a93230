//! The contract between pools and the database client.
//!
//! Pools never talk to a storage engine directly. They configure a
//! [`ConnectionFactory`] once per process and ask it for connections,
//! which they commit, roll back or close through [`DbConnection`].

use crate::storage::error::StorageResult;
use crate::storage::types::{Credentials, DbType, TxType};

/// A handle to one open database connection.
///
/// Handles are cheap to clone; every clone refers to the same connection,
/// so a pool can keep one copy bound to the current thread while
/// application code works with another.
pub trait DbConnection: Clone + Send + 'static {
    /// Transaction type the connection was opened with.
    fn tx_type(&self) -> TxType;

    /// Check if the connection was closed.
    fn is_closed(&self) -> bool;

    /// Make buffered changes durable.
    fn commit(&self) -> StorageResult<()>;

    /// Discard buffered changes.
    fn rollback(&self) -> StorageResult<()>;

    /// Release the connection. Buffered changes are discarded.
    fn close(&self);
}

/// Creates connections for one database view.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: DbConnection;

    /// View served by this factory.
    fn db_type(&self) -> DbType;

    /// Prepare the factory for the given database. Opens no connection.
    fn configure(&self, credentials: &Credentials) -> StorageResult<()>;

    /// Open a new connection with the given transaction type.
    fn open(&self, tx_type: TxType) -> StorageResult<Self::Connection>;

    /// Drop factory resources. `open` fails until the next `configure`.
    fn release(&self);
}
