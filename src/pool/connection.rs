//! Generic connection pool over a database client factory.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::pool::manager::{ConnectionSource, PoolManager};
use crate::storage::{ConnectionFactory, Credentials, DbConnection, DbType, TxType};
use crate::transaction::{TransactionError, TransactionResult};

/// A pool keeping at most one open connection per thread.
///
/// Connections are opened lazily on the first request inside a unit of
/// work and released when the unit commits or rolls back.
pub struct Pool<F: ConnectionFactory> {
    factory: F,
    started: Mutex<bool>,
    connections: Mutex<HashMap<ThreadId, F::Connection>>,
}

impl<F: ConnectionFactory> Pool<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            started: Mutex::new(false),
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }

    /// Number of threads currently holding a connection.
    pub fn open_connections(&self) -> usize {
        self.connections.lock().len()
    }

    /// Check if the current thread holds a connection.
    pub fn has_connection(&self) -> bool {
        self.connections.lock().contains_key(&thread::current().id())
    }

    fn take_connection(&self) -> Option<F::Connection> {
        self.connections.lock().remove(&thread::current().id())
    }
}

impl<F: ConnectionFactory> PoolManager for Pool<F> {
    fn db_type(&self) -> DbType {
        self.factory.db_type()
    }

    fn start(&self, credentials: &Credentials) -> TransactionResult<()> {
        let mut started = self.started.lock();
        if *started {
            debug!(pool = %self.db_type(), "pool already started");
            return Ok(());
        }
        self.factory.configure(credentials)?;
        *started = true;
        info!(pool = %self.db_type(), uri = %credentials.uri, "pool started");
        Ok(())
    }

    fn stop(&self) -> TransactionResult<()> {
        let mut started = self.started.lock();
        let open = self.open_connections();
        if open > 0 {
            return Err(TransactionError::misuse(format!(
                "{} pool stopped while {} unit(s) of work hold a connection",
                self.db_type(),
                open
            )));
        }
        if *started {
            self.factory.release();
            *started = false;
            info!(pool = %self.db_type(), "pool stopped");
        }
        Ok(())
    }

    fn commit(&self) -> TransactionResult<()> {
        let connection = match self.take_connection() {
            Some(connection) => connection,
            None => return Ok(()),
        };
        let pool = self.db_type();

        if connection.is_closed() {
            error!(pool = %pool, "connection closed by user code before commit");
            return Err(TransactionError::Consistency { pool });
        }

        if !connection.tx_type().is_transactional() {
            connection.close();
            return Ok(());
        }

        match connection.commit() {
            Ok(()) => {
                connection.close();
                debug!(pool = %pool, "pool committed");
                Ok(())
            }
            Err(source) => {
                if let Err(e) = connection.rollback() {
                    warn!(pool = %pool, error = %e, "rollback after failed commit failed");
                }
                connection.close();
                Err(TransactionError::Commit { pool, source })
            }
        }
    }

    fn rollback(&self) -> TransactionResult<()> {
        let connection = match self.take_connection() {
            Some(connection) => connection,
            None => return Ok(()),
        };
        let pool = self.db_type();

        if connection.is_closed() || !connection.tx_type().is_transactional() {
            connection.close();
            return Ok(());
        }

        let result = connection.rollback();
        connection.close();
        debug!(pool = %pool, "pool rolled back");
        result.map_err(|source| TransactionError::Rollback { pool, source })
    }

    fn close_connection(&self) {
        if let Some(connection) = self.take_connection() {
            connection.close();
        }
    }
}

impl<F: ConnectionFactory> ConnectionSource for Pool<F> {
    type Connection = F::Connection;

    fn connection(&self, tx_type: TxType) -> TransactionResult<F::Connection> {
        if !self.is_started() {
            return Err(TransactionError::NotStarted {
                pool: self.db_type(),
            });
        }

        let mut connections = self.connections.lock();
        let thread_id = thread::current().id();
        if let Some(connection) = connections.get(&thread_id) {
            return Ok(connection.clone());
        }

        let connection = self.factory.open(tx_type)?;
        debug!(pool = %self.db_type(), tx_type = %tx_type, "connection opened");
        connections.insert(thread_id, connection.clone());
        Ok(connection)
    }
}
