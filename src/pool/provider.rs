//! Connection providers handed to application code.

use std::sync::Arc;

use crate::pool::manager::ConnectionSource;
use crate::transaction::{TransactionManager, TransactionResult};

/// Gives application code the current unit of work's connection of one pool.
///
/// The first `get` inside a unit of work opens the pool's connection and
/// makes the pool part of the unit. Outside a unit of work `get` fails
/// with [`TransactionError::NoUnitOfWork`](crate::transaction::TransactionError::NoUnitOfWork).
pub struct Provider<P> {
    manager: TransactionManager,
    pool: Arc<P>,
    index: usize,
}

impl<P> Clone for Provider<P> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            pool: self.pool.clone(),
            index: self.index,
        }
    }
}

impl<P> Provider<P> {
    pub(crate) fn new(manager: TransactionManager, pool: Arc<P>, index: usize) -> Self {
        Self {
            manager,
            pool,
            index,
        }
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }
}

impl<P: ConnectionSource> Provider<P> {
    pub fn get(&self) -> TransactionResult<P::Connection> {
        let tx_type = self.manager.activate(self.index)?;
        self.pool.connection(tx_type)
    }
}
