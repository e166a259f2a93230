//! Database client layer for poolweave
//!
//! The pools only depend on the [`ConnectionFactory`] / [`DbConnection`]
//! contract defined here. A real deployment plugs in its own multi-model
//! client; the bundled [`MemoryStorage`] serves document, object and graph
//! views over one shared record store.
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MemoryStorage                           │
//! │           (named clusters of JSON records)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │  document   │       │   object    │       │    graph    │
//!  │   (JSON)    │       │   (serde)   │       │  (V / E)    │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use poolweave::storage::{ConnectionFactory, Credentials, DbConnection, MemoryStorage, TxType};
//!
//! let storage = MemoryStorage::new("shop");
//! let factory = storage.document_factory();
//! factory.configure(&Credentials::new(storage.uri(), "admin", "admin"))?;
//!
//! let conn = factory.open(TxType::Optimistic)?;
//! conn.save("Order", "o1", json!({"total": 42}))?;
//! conn.commit()?;
//! ```

mod client;
mod error;
mod memory;
mod types;

pub use client::{ConnectionFactory, DbConnection};
pub use error::{StorageError, StorageResult};
pub use memory::{
    DocumentConnection, DocumentFactory, Edge, GraphConnection, GraphFactory, MemoryConnection,
    MemoryFactory, MemoryStorage, MemoryView, ObjectConnection, ObjectFactory, EDGE_CLUSTER,
    MEMORY_SCHEME, VERTEX_CLUSTER,
};
pub use types::{Credentials, DbType, TxType};
