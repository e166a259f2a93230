//! Graph providers split by transaction type.
//!
//! A graph connection behaves differently depending on whether the unit
//! of work is transactional, so application code asks for the flavour it
//! expects and fails early when the unit disagrees.

use crate::pool::manager::ConnectionSource;
use crate::pool::provider::Provider;
use crate::storage::TxType;
use crate::transaction::{TransactionError, TransactionResult};

/// Graph connection for OPTIMISTIC or PESSIMISTIC units only.
pub struct GraphTxProvider<P> {
    inner: Provider<P>,
}

/// Graph connection for NOTX units only.
pub struct GraphNoTxProvider<P> {
    inner: Provider<P>,
}

impl<P: ConnectionSource> GraphTxProvider<P> {
    pub fn new(inner: Provider<P>) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> TransactionResult<P::Connection> {
        let actual = self.inner.manager().transaction_type()?;
        if !actual.is_transactional() {
            return Err(TransactionError::TxTypeMismatch {
                provider: "transactional graph",
                actual,
            });
        }
        self.inner.get()
    }
}

impl<P: ConnectionSource> GraphNoTxProvider<P> {
    pub fn new(inner: Provider<P>) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> TransactionResult<P::Connection> {
        let actual = self.inner.manager().transaction_type()?;
        if actual != TxType::NoTx {
            return Err(TransactionError::TxTypeMismatch {
                provider: "non-transactional graph",
                actual,
            });
        }
        self.inner.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Pool, PoolManager};
    use crate::storage::{Credentials, GraphFactory, MemoryStorage};
    use crate::transaction::{TransactionManager, TxConfig};

    fn setup() -> (TransactionManager, Provider<Pool<GraphFactory>>) {
        let storage = MemoryStorage::new("graphs");
        let manager = TransactionManager::new(TxConfig::default());
        let provider = manager.register(Pool::new(storage.graph_factory()));
        provider
            .pool()
            .start(&Credentials::new(storage.uri(), "admin", "admin"))
            .unwrap();
        (manager, provider)
    }

    #[test]
    fn test_tx_graph_requires_transaction() {
        let (manager, provider) = setup();
        let graphs = GraphTxProvider::new(provider);

        manager.begin_with(TxConfig::new(TxType::Optimistic));
        assert!(graphs.get().unwrap().is_transactional());
        manager.end().unwrap();

        manager.begin_with(TxConfig::new(TxType::NoTx));
        assert!(matches!(
            graphs.get(),
            Err(TransactionError::TxTypeMismatch {
                actual: TxType::NoTx,
                ..
            })
        ));
        manager.end().unwrap();
    }

    #[test]
    fn test_notx_graph_requires_notx() {
        let (manager, provider) = setup();
        let graphs = GraphNoTxProvider::new(provider);

        manager.begin_with(TxConfig::new(TxType::NoTx));
        assert!(!graphs.get().unwrap().is_transactional());
        manager.end().unwrap();

        manager.begin_with(TxConfig::new(TxType::Pessimistic));
        assert!(graphs.get().is_err());
        manager.end().unwrap();
    }

    #[test]
    fn test_graph_providers_outside_unit_of_work() {
        let (_manager, provider) = setup();
        let tx = GraphTxProvider::new(provider.clone());
        let notx = GraphNoTxProvider::new(provider);

        assert!(matches!(tx.get(), Err(TransactionError::NoUnitOfWork)));
        assert!(matches!(notx.get(), Err(TransactionError::NoUnitOfWork)));
    }
}
