//! poolweave - unit-of-work transactions across database connection pools
//!
//! This crate coordinates one unit of work per thread over several
//! connection pools (document, object and graph views of one database).
//! Pools join a unit lazily when application code first asks for their
//! connection, and are committed or rolled back together when it ends.
//!
//! # Example
//!
//! ```no_run
//! use poolweave::service::{PersistConfig, PersistService};
//! use poolweave::storage::MemoryStorage;
//! use poolweave::transaction::TransactionError;
//! use serde_json::json;
//!
//! let storage = MemoryStorage::new("shop");
//! let config = PersistConfig::new(storage.uri(), "admin", "admin");
//! let service = PersistService::with_memory_pools(config, &storage);
//! service.start().unwrap();
//!
//! let documents = service.documents().unwrap();
//! let result: Result<(), TransactionError> = service.template().run(|| {
//!     documents
//!         .get()?
//!         .save("Order", "o1", json!({"total": 42}))
//!         .map_err(TransactionError::from)
//! });
//! result.unwrap();
//! ```

pub mod pool;
pub mod service;
pub mod storage;
pub mod transaction;

#[cfg(test)]
mod testing;
