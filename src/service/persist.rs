//! Persist service - the process-wide entry point.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::pool::{PoolManager, Provider};
use crate::service::config::PersistConfig;
use crate::transaction::{
    TransactionError, TransactionInterceptor, TransactionManager, TransactionResult, TxTemplate,
};

/// Hook run once on start, after all pools started, before [`DataInitializer`].
pub trait SchemeInitializer: Send + Sync {
    fn initialize_scheme(&self, template: &TxTemplate) -> TransactionResult<()>;
}

/// Hook run once on start, after the scheme initializer.
pub trait DataInitializer: Send + Sync {
    fn initialize_data(&self, template: &TxTemplate) -> TransactionResult<()>;
}

/// Initializer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInitializer;

impl SchemeInitializer for NoopInitializer {
    fn initialize_scheme(&self, _template: &TxTemplate) -> TransactionResult<()> {
        Ok(())
    }
}

impl DataInitializer for NoopInitializer {
    fn initialize_data(&self, _template: &TxTemplate) -> TransactionResult<()> {
        Ok(())
    }
}

/// Owns the transaction manager and drives the pools' lifecycle.
///
/// `start` starts pools in registration order, `stop` stops them in
/// reverse registration order.
pub struct PersistService {
    config: PersistConfig,
    manager: TransactionManager,
    scheme: Box<dyn SchemeInitializer>,
    data: Box<dyn DataInitializer>,
    started: Mutex<bool>,
}

/// Collects pools and hooks before the service is built.
pub struct PersistServiceBuilder {
    config: PersistConfig,
    manager: TransactionManager,
    scheme: Box<dyn SchemeInitializer>,
    data: Box<dyn DataInitializer>,
}

impl PersistServiceBuilder {
    /// Register a pool. Registration order is commit order.
    pub fn pool<P: PoolManager>(&mut self, pool: P) -> Provider<P> {
        self.manager.register(pool)
    }

    pub fn scheme_initializer(&mut self, initializer: impl SchemeInitializer + 'static) -> &mut Self {
        self.scheme = Box::new(initializer);
        self
    }

    pub fn data_initializer(&mut self, initializer: impl DataInitializer + 'static) -> &mut Self {
        self.data = Box::new(initializer);
        self
    }

    pub fn build(self) -> PersistService {
        PersistService {
            config: self.config,
            manager: self.manager,
            scheme: self.scheme,
            data: self.data,
            started: Mutex::new(false),
        }
    }
}

impl PersistService {
    pub fn builder(config: PersistConfig) -> PersistServiceBuilder {
        let manager = TransactionManager::new(config.tx.clone());
        PersistServiceBuilder {
            config,
            manager,
            scheme: Box::new(NoopInitializer),
            data: Box::new(NoopInitializer),
        }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    pub fn template(&self) -> TxTemplate {
        TxTemplate::new(self.manager.clone())
    }

    pub fn interceptor(&self) -> TransactionInterceptor {
        TransactionInterceptor::new(self.manager.clone())
    }

    /// Provider for a registered pool type.
    pub fn provider<P: PoolManager>(&self) -> TransactionResult<Provider<P>> {
        self.manager.provider::<P>()
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }

    /// Start every pool, then run the initializers. Calling it again is a no-op.
    ///
    /// If a pool or an initializer fails, the pools started so far are
    /// stopped again and the error is returned.
    pub fn start(&self) -> TransactionResult<()> {
        let mut started = self.started.lock();
        if *started {
            return Ok(());
        }

        let pools = self.manager.pools();
        for (position, pool) in pools.iter().enumerate() {
            if let Err(e) = pool.start(&self.config.credentials) {
                error!(pool = %pool.db_type(), error = %e, "pool failed to start");
                unwind(&pools[..position]);
                return Err(e);
            }
        }

        let template = self.template();
        let initialized = self
            .scheme
            .initialize_scheme(&template)
            .and_then(|()| self.data.initialize_data(&template));
        if let Err(e) = initialized {
            error!(error = %e, "initializer failed");
            unwind(&pools);
            return Err(e);
        }

        *started = true;
        info!(uri = %self.config.credentials.uri, pools = pools.len(), "persist service started");
        Ok(())
    }

    /// Stop every pool in reverse registration order.
    ///
    /// Fails without stopping anything while any thread has a unit of work
    /// open. Otherwise every pool is stopped and the first failure, if any,
    /// is returned.
    pub fn stop(&self) -> TransactionResult<()> {
        let mut started = self.started.lock();
        let active = self.manager.active_count();
        if active > 0 {
            return Err(TransactionError::misuse(format!(
                "persist service stopped while {} unit(s) of work are active",
                active
            )));
        }
        if !*started {
            return Ok(());
        }

        let mut first_failure = None;
        for pool in self.manager.pools().iter().rev() {
            if let Err(e) = pool.stop() {
                warn!(pool = %pool.db_type(), error = %e, "pool failed to stop");
                first_failure.get_or_insert(e);
            }
        }

        *started = false;
        info!("persist service stopped");
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Stop already started pools in reverse order, logging failures.
fn unwind(pools: &[Arc<dyn PoolManager>]) {
    for pool in pools.iter().rev() {
        if let Err(e) = pool.stop() {
            warn!(pool = %pool.db_type(), error = %e, "pool failed to stop");
        }
    }
}

impl std::fmt::Debug for PersistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistService")
            .field("uri", &self.config.credentials.uri)
            .field("started", &self.is_started())
            .field("manager", &self.manager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::storage::DbType;
    use crate::testing::RecordingPool;

    fn config() -> PersistConfig {
        PersistConfig::new("memory:svc", "admin", "admin")
    }

    #[test]
    fn test_start_and_stop_order() {
        let mut builder = PersistService::builder(config());
        let a = builder.pool(RecordingPool::new(DbType::Document));
        let b = builder.pool(RecordingPool::new(DbType::Object));
        let c = builder.pool(RecordingPool::new(DbType::Graph));
        let service = builder.build();

        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_started());
        assert!(a.pool().is_started() && b.pool().is_started() && c.pool().is_started());

        service.stop().unwrap();
        assert!(!service.is_started());

        let journal = RecordingPool::journal_of(&[a.pool(), b.pool(), c.pool()]);
        assert_eq!(
            journal,
            vec![
                (DbType::Document, "start"),
                (DbType::Object, "start"),
                (DbType::Graph, "start"),
                (DbType::Graph, "stop"),
                (DbType::Object, "stop"),
                (DbType::Document, "stop"),
            ]
        );
    }

    #[test]
    fn test_stop_with_active_unit_fails() {
        let mut builder = PersistService::builder(config());
        let a = builder.pool(RecordingPool::new(DbType::Document));
        let service = builder.build();
        service.start().unwrap();

        service.manager().begin();
        a.get().unwrap();
        assert!(matches!(service.stop(), Err(TransactionError::Misuse(_))));
        assert!(service.is_started());
        assert!(a.pool().is_started());

        service.manager().end().unwrap();
        service.stop().unwrap();
    }

    #[test]
    fn test_initializers_run_in_order_after_pools_start() {
        struct Scheme(Arc<AtomicUsize>, Provider<RecordingPool>);
        struct Data(Arc<AtomicUsize>);

        impl SchemeInitializer for Scheme {
            fn initialize_scheme(&self, template: &TxTemplate) -> TransactionResult<()> {
                assert!(self.1.pool().is_started());
                assert_eq!(self.0.fetch_add(1, Ordering::SeqCst), 0);
                template.run(|| self.1.get().map(|_| ()))
            }
        }

        impl DataInitializer for Data {
            fn initialize_data(&self, _template: &TxTemplate) -> TransactionResult<()> {
                assert_eq!(self.0.fetch_add(1, Ordering::SeqCst), 1);
                Ok(())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = PersistService::builder(config());
        let a = builder.pool(RecordingPool::new(DbType::Document));
        builder
            .scheme_initializer(Scheme(calls.clone(), a.clone()))
            .data_initializer(Data(calls.clone()));
        let service = builder.build();

        service.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.pool().commits(), 1);

        // Second start does not rerun the hooks
        service.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_initializer_aborts_start() {
        struct Failing;
        impl DataInitializer for Failing {
            fn initialize_data(&self, _template: &TxTemplate) -> TransactionResult<()> {
                Err(TransactionError::misuse("no data"))
            }
        }

        let mut builder = PersistService::builder(config());
        let a = builder.pool(RecordingPool::new(DbType::Document));
        let b = builder.pool(RecordingPool::new(DbType::Object));
        builder.data_initializer(Failing);
        let service = builder.build();

        assert!(matches!(service.start(), Err(TransactionError::Misuse(_))));
        assert!(!service.is_started());
        assert!(!a.pool().is_started());
        assert!(!b.pool().is_started());

        let journal = RecordingPool::journal_of(&[a.pool(), b.pool()]);
        assert_eq!(
            journal,
            vec![
                (DbType::Document, "start"),
                (DbType::Object, "start"),
                (DbType::Object, "stop"),
                (DbType::Document, "stop"),
            ]
        );
        service.stop().unwrap();
    }

    #[test]
    fn test_provider_lookup() {
        let mut builder = PersistService::builder(config());
        builder.pool(RecordingPool::new(DbType::Object));
        let service = builder.build();

        let provider = service.provider::<RecordingPool>().unwrap();
        assert_eq!(provider.pool().db_type(), DbType::Object);
    }
}
