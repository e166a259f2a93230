//! Connection pools taking part in units of work.
//!
//! Each pool serves one database view (document, object or graph) and
//! keeps at most one connection per thread. Pools are registered with a
//! [`TransactionManager`](crate::transaction::TransactionManager), which
//! commits or rolls back every pool a unit of work touched.
//!
//! # Usage
//!
//! ```ignore
//! use poolweave::pool::Pool;
//! use poolweave::transaction::{TransactionManager, TxConfig};
//!
//! let manager = TransactionManager::new(TxConfig::default());
//! let documents = manager.register(Pool::new(storage.document_factory()));
//!
//! manager.begin();
//! documents.get()?.save("Order", "o1", json!({"total": 42}))?;
//! manager.end()?;
//! ```

mod connection;
#[cfg(feature = "graph")]
mod graph;
mod manager;
mod provider;
mod registry;

pub use connection::Pool;
#[cfg(feature = "graph")]
pub use graph::{GraphNoTxProvider, GraphTxProvider};
pub use manager::{ConnectionSource, PoolManager};
pub use provider::Provider;
pub use registry::PoolRegistry;

pub use crate::storage::DbType;
