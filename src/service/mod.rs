//! Process-wide persistence service.
//!
//! [`PersistService`] owns the [`TransactionManager`](crate::transaction::TransactionManager)
//! and the registered pools. It starts the pools with the configured
//! credentials, runs the scheme and data initializers, and hands out
//! providers, templates and interceptors.
//!
//! # Usage
//!
//! ```ignore
//! use poolweave::service::{PersistConfig, PersistService};
//! use poolweave::storage::MemoryStorage;
//!
//! let storage = MemoryStorage::new("shop");
//! let config = PersistConfig::new(storage.uri(), "admin", "admin");
//! let service = PersistService::with_memory_pools(config, &storage);
//! service.start()?;
//!
//! let documents = service.documents()?;
//! service.template().run(|| {
//!     documents.get()?.save("Order", "o1", json!({"total": 42}))?;
//!     Ok::<_, AppError>(())
//! })?;
//!
//! service.stop()?;
//! ```

mod config;
mod defaults;
mod persist;

pub use config::{ConfigError, ConfigResult, PersistConfig};
pub use defaults::{register_memory_pools, DocumentPool};
#[cfg(feature = "graph")]
pub use defaults::GraphPool;
#[cfg(feature = "object")]
pub use defaults::ObjectPool;
pub use persist::{
    DataInitializer, NoopInitializer, PersistService, PersistServiceBuilder, SchemeInitializer,
};
