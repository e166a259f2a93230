//! Standard pools over a [`MemoryStorage`].
//!
//! The document pool is always registered. Object and graph pools are
//! registered when the `object` and `graph` features are enabled.

use crate::pool::{Pool, Provider};
use crate::service::config::PersistConfig;
use crate::service::persist::{PersistService, PersistServiceBuilder};
use crate::storage::{DocumentFactory, MemoryStorage};
use crate::transaction::TransactionResult;

#[cfg(feature = "graph")]
use crate::pool::{GraphNoTxProvider, GraphTxProvider};
#[cfg(feature = "graph")]
use crate::storage::GraphFactory;
#[cfg(feature = "object")]
use crate::storage::ObjectFactory;

pub type DocumentPool = Pool<DocumentFactory>;
#[cfg(feature = "object")]
pub type ObjectPool = Pool<ObjectFactory>;
#[cfg(feature = "graph")]
pub type GraphPool = Pool<GraphFactory>;

/// Register the standard pools in document, object, graph order.
pub fn register_memory_pools(builder: &mut PersistServiceBuilder, storage: &MemoryStorage) {
    builder.pool(DocumentPool::new(storage.document_factory()));
    #[cfg(feature = "object")]
    builder.pool(ObjectPool::new(storage.object_factory()));
    #[cfg(feature = "graph")]
    builder.pool(GraphPool::new(storage.graph_factory()));
}

impl PersistService {
    /// Service with the standard pools over `storage`.
    pub fn with_memory_pools(config: PersistConfig, storage: &MemoryStorage) -> Self {
        let mut builder = Self::builder(config);
        register_memory_pools(&mut builder, storage);
        builder.build()
    }

    pub fn documents(&self) -> TransactionResult<Provider<DocumentPool>> {
        self.provider::<DocumentPool>()
    }

    #[cfg(feature = "object")]
    pub fn objects(&self) -> TransactionResult<Provider<ObjectPool>> {
        self.provider::<ObjectPool>()
    }

    /// Graph connection in any unit of work.
    #[cfg(feature = "graph")]
    pub fn graphs(&self) -> TransactionResult<Provider<GraphPool>> {
        self.provider::<GraphPool>()
    }

    #[cfg(feature = "graph")]
    pub fn tx_graphs(&self) -> TransactionResult<GraphTxProvider<GraphPool>> {
        self.graphs().map(GraphTxProvider::new)
    }

    #[cfg(feature = "graph")]
    pub fn notx_graphs(&self) -> TransactionResult<GraphNoTxProvider<GraphPool>> {
        self.graphs().map(GraphNoTxProvider::new)
    }
}

#[cfg(all(test, feature = "object", feature = "graph"))]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::storage::{DbConnection, DbType, StorageError, TxType, VERTEX_CLUSTER};
    use crate::transaction::{kinds, Classify, ErrorKind, TransactionError, TxConfig};

    static CHECKOUT: ErrorKind = ErrorKind::child("checkout", &kinds::ANY);
    static OUT_OF_STOCK: ErrorKind = ErrorKind::child("out_of_stock", &CHECKOUT);

    #[derive(Debug)]
    enum ShopError {
        OutOfStock,
        Tx(TransactionError),
        Storage(StorageError),
    }

    impl From<TransactionError> for ShopError {
        fn from(e: TransactionError) -> Self {
            ShopError::Tx(e)
        }
    }

    impl From<StorageError> for ShopError {
        fn from(e: StorageError) -> Self {
            ShopError::Storage(e)
        }
    }

    impl Classify for ShopError {
        fn kind(&self) -> &'static ErrorKind {
            match self {
                ShopError::OutOfStock => &OUT_OF_STOCK,
                ShopError::Tx(e) => e.kind(),
                ShopError::Storage(e) => e.kind(),
            }
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        item: String,
        quantity: u32,
    }

    fn setup() -> (MemoryStorage, PersistService) {
        let storage = MemoryStorage::new("shop");
        let config = PersistConfig::new(storage.uri(), "admin", "admin");
        let service = PersistService::with_memory_pools(config, &storage);
        service.start().unwrap();
        (storage, service)
    }

    fn place_order(service: &PersistService) -> Result<(), ShopError> {
        let orders = service.objects()?.get()?;
        orders.save(
            "Order",
            "o1",
            &Order {
                item: "lamp".into(),
                quantity: 2,
            },
        )?;
        service
            .documents()?
            .get()?
            .save("Audit", "a1", json!({"event": "order placed"}))?;
        service.graphs()?.get()?.add_vertex("o1", json!({}))?;
        Ok(())
    }

    #[test]
    fn test_pools_registered_in_order() {
        let (_storage, service) = setup();
        let types: Vec<DbType> = service
            .manager()
            .pools()
            .iter()
            .map(|pool| pool.db_type())
            .collect();
        assert_eq!(types, vec![DbType::Document, DbType::Object, DbType::Graph]);
    }

    #[test]
    fn test_unit_of_work_commits_all_views() {
        let (storage, service) = setup();

        service.template().run(|| place_order(&service)).unwrap();

        assert_eq!(storage.count("Order"), 1);
        assert_eq!(storage.count("Audit"), 1);
        assert!(storage.record(VERTEX_CLUSTER, "o1").is_some());

        // The object view and the document view read the same record
        let loaded: Result<Option<Order>, ShopError> = service.template().run(|| {
            let doc = service.documents()?.get()?.load("Order", "o1")?;
            assert_eq!(doc.unwrap()["item"], json!("lamp"));
            Ok(service.objects()?.get()?.load("Order", "o1")?)
        });
        assert_eq!(loaded.unwrap().unwrap().quantity, 2);
    }

    #[test]
    fn test_failure_rolls_back_all_views() {
        let (storage, service) = setup();

        let result = service.template().run(|| {
            place_order(&service)?;
            Err::<(), _>(ShopError::OutOfStock)
        });

        assert!(matches!(result, Err(ShopError::OutOfStock)));
        assert_eq!(storage.count("Order"), 0);
        assert_eq!(storage.count("Audit"), 0);
        assert_eq!(storage.count(VERTEX_CLUSTER), 0);
    }

    #[test]
    fn test_ignored_failure_keeps_data() {
        let (storage, service) = setup();
        let config = TxConfig::default().ignore(&CHECKOUT);

        let result = service.template().run_with(config, || {
            place_order(&service)?;
            Err::<(), _>(ShopError::OutOfStock)
        });

        assert!(matches!(result, Err(ShopError::OutOfStock)));
        assert_eq!(storage.count("Order"), 1);
    }

    #[test]
    fn test_graph_commit_failure_keeps_earlier_views_committed() {
        let (storage, service) = setup();
        storage.fail_next_commits(DbType::Graph, 1);

        let result = service.template().run(|| place_order(&service));

        assert!(matches!(
            result,
            Err(ShopError::Tx(TransactionError::Commit {
                pool: DbType::Graph,
                ..
            }))
        ));
        // Document and object pools committed before the graph pool failed
        assert_eq!(storage.count("Order"), 1);
        assert_eq!(storage.count(VERTEX_CLUSTER), 0);
    }

    #[test]
    fn test_closed_connection_is_consistency_error() {
        let (storage, service) = setup();

        let result: Result<(), ShopError> = service.template().run(|| {
            let docs = service.documents()?.get()?;
            docs.save("Audit", "a1", json!({}))?;
            docs.close();
            Ok(())
        });

        assert!(matches!(
            result,
            Err(ShopError::Tx(TransactionError::Consistency {
                pool: DbType::Document
            }))
        ));
        assert_eq!(storage.count("Audit"), 0);
        assert!(!service.manager().is_transaction_active());
    }

    #[test]
    fn test_later_graph_failure_reported_over_closed_documents() {
        let (storage, service) = setup();
        storage.fail_next_commits(DbType::Graph, 1);

        let result: Result<(), ShopError> = service.template().run(|| {
            let docs = service.documents()?.get()?;
            docs.save("Audit", "a1", json!({}))?;
            docs.close();
            service.graphs()?.get()?.add_vertex("o1", json!({}))?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(ShopError::Tx(TransactionError::Commit {
                pool: DbType::Graph,
                ..
            }))
        ));
        assert_eq!(storage.count("Audit"), 0);
        assert_eq!(storage.count(VERTEX_CLUSTER), 0);
    }

    #[test]
    fn test_graph_providers_follow_tx_type() {
        let (_storage, service) = setup();

        let notx: Result<bool, ShopError> = service
            .template()
            .run_with(TxConfig::new(TxType::NoTx), || {
                assert!(service.tx_graphs()?.get().is_err());
                Ok(service.notx_graphs()?.get()?.is_transactional())
            });
        assert!(!notx.unwrap());

        let tx: Result<bool, ShopError> = service.template().run(|| {
            Ok(service.tx_graphs()?.get()?.is_transactional())
        });
        assert!(tx.unwrap());
    }

    #[test]
    fn test_connections_require_started_service() {
        let storage = MemoryStorage::new("cold");
        let config = PersistConfig::new(storage.uri(), "admin", "admin");
        let service = PersistService::with_memory_pools(config, &storage);

        let result: Result<(), ShopError> = service.template().run(|| {
            service.documents()?.get()?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(ShopError::Tx(TransactionError::NotStarted {
                pool: DbType::Document
            }))
        ));
    }

    #[test]
    fn test_bad_credentials_fail_start() {
        let storage = MemoryStorage::new("locked");
        let config = PersistConfig::new(storage.uri(), "admin", "wrong");
        let service = PersistService::with_memory_pools(config, &storage);

        assert!(matches!(
            service.start(),
            Err(TransactionError::Storage(StorageError::AuthenticationFailed { .. }))
        ));
        assert!(!service.is_started());
        let documents = service.documents().unwrap();
        assert!(!documents.pool().is_started());
    }

    #[test]
    fn test_stop_then_restart() {
        let (storage, service) = setup();
        service.stop().unwrap();

        let result: Result<(), ShopError> = service.template().run(|| {
            service.documents()?.get()?;
            Ok(())
        });
        assert!(result.is_err());

        service.start().unwrap();
        service.template().run(|| place_order(&service)).unwrap();
        assert_eq!(storage.count("Order"), 1);
        service.stop().unwrap();
    }
}
