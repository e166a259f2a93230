//! Unit-of-work orchestration for poolweave.
//!
//! A unit of work spans every pool the application touches on the current
//! thread. Pools join lazily on their first connection request; when the
//! unit ends, the manager commits or rolls back each of them in
//! registration order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │         TxTemplate / SpecificTxTemplate / Interceptor       │
//! │     (run a closure, classify its error, end the unit)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TransactionManager                        │
//! │   (one unit per thread, touched pools, commit / rollback)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │  document   │       │   object    │       │    graph    │
//!  │    pool     │       │    pool     │       │    pool     │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use poolweave::transaction::{TxConfig, TxTemplate};
//!
//! let template = TxTemplate::new(manager);
//! let config = TxConfig::default().rollback_on(&IO).ignore(&FILE_NOT_FOUND);
//!
//! template.run_with(config, || {
//!     documents.get()?.save("Order", "o1", json!({"total": 42}))?;
//!     graphs.get()?.add_vertex("o1", json!({}))?;
//!     Ok(())
//! })?;
//! ```

mod config;
mod error;
mod interceptor;
mod manager;
mod rules;
mod template;

pub use config::TxConfig;
pub use error::{TransactionError, TransactionResult};
pub use interceptor::{TransactionInterceptor, Transactional};
pub use manager::{TransactionManager, UnitOfWork};
pub use rules::{decide, kinds, Classify, ErrorKind, KindTable, MatchRule, Outcome};
pub use template::{SpecificTxTemplate, TxTemplate};

pub use crate::storage::TxType;
