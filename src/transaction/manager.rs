//! Transaction manager - coordinates units of work across pools.
//!
//! The TransactionManager is the main entry point for transactions.
//! It handles:
//! - Opening and closing one unit of work per thread
//! - Recording which pools a unit touched
//! - Committing or rolling back the touched pools in registration order
//! - Collapsing multiple pool failures into the error reported to the caller

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::pool::{PoolManager, PoolRegistry, Provider};
use crate::storage::TxType;
use crate::transaction::config::TxConfig;
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::rules::{ErrorKind, Outcome};

/// Snapshot of a thread's unit of work.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    /// Unique unit ID.
    pub id: String,
    /// Config the unit was opened with.
    pub config: TxConfig,
    /// Registry indices of the pools touched so far.
    pub touched: BTreeSet<usize>,
    /// When the unit started.
    pub started_at: DateTime<Utc>,
}

impl UnitOfWork {
    fn new(config: TxConfig) -> Self {
        Self {
            id: Ulid::new().to_string().to_lowercase(),
            config,
            touched: BTreeSet::new(),
            started_at: Utc::now(),
        }
    }

    pub fn tx_type(&self) -> TxType {
        self.config.tx_type()
    }
}

/// Transaction manager - coordinates units of work across registered pools.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
/// Each thread has at most one unit of work; units on different threads
/// never see each other's pools or connections.
#[derive(Clone)]
pub struct TransactionManager {
    inner: Arc<TransactionManagerInner>,
}

struct TransactionManagerInner {
    /// Config used by `begin` and by callers that supply none.
    default_config: TxConfig,
    /// Pools in registration order.
    registry: RwLock<PoolRegistry>,
    /// Open units of work by owning thread.
    units: Mutex<HashMap<ThreadId, UnitOfWork>>,
}

impl TransactionManager {
    pub fn new(default_config: TxConfig) -> Self {
        Self {
            inner: Arc::new(TransactionManagerInner {
                default_config,
                registry: RwLock::new(PoolRegistry::new()),
                units: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn default_config(&self) -> &TxConfig {
        &self.inner.default_config
    }

    // ==================== Pools ====================

    /// Register a pool and get a provider for its connections.
    pub fn register<P: PoolManager>(&self, pool: P) -> Provider<P> {
        let pool = Arc::new(pool);
        let index = self.inner.registry.write().register(pool.clone());
        debug!(pool = %pool.db_type(), index, "pool registered");
        Provider::new(self.clone(), pool, index)
    }

    /// Provider for the first registered pool of type `P`.
    pub fn provider<P: PoolManager>(&self) -> TransactionResult<Provider<P>> {
        let (index, pool) = self
            .inner
            .registry
            .read()
            .find::<P>()
            .ok_or(TransactionError::PoolNotRegistered(std::any::type_name::<P>()))?;
        Ok(Provider::new(self.clone(), pool, index))
    }

    /// All registered pools in registration order.
    pub fn pools(&self) -> Vec<Arc<dyn PoolManager>> {
        self.inner.registry.read().pools()
    }

    // ==================== Unit of work ====================

    /// Begin a unit of work with the default config.
    pub fn begin(&self) -> bool {
        self.begin_with(self.inner.default_config.clone())
    }

    /// Begin a unit of work on the current thread.
    ///
    /// Returns `false` when the thread already has a unit; the call then
    /// joins that unit and the caller must not end it.
    pub fn begin_with(&self, config: TxConfig) -> bool {
        let mut units = self.inner.units.lock();
        let thread_id = thread::current().id();
        if let Some(unit) = units.get(&thread_id) {
            debug!(unit = %unit.id, "joined active unit of work");
            return false;
        }
        let unit = UnitOfWork::new(config);
        debug!(unit = %unit.id, tx_type = %unit.tx_type(), "unit of work started");
        units.insert(thread_id, unit);
        true
    }

    /// Check if the current thread has a unit of work.
    pub fn is_transaction_active(&self) -> bool {
        self.inner.units.lock().contains_key(&thread::current().id())
    }

    /// Number of units of work open across all threads.
    pub fn active_count(&self) -> usize {
        self.inner.units.lock().len()
    }

    /// Snapshot of the current thread's unit of work.
    pub fn current_unit(&self) -> Option<UnitOfWork> {
        self.inner.units.lock().get(&thread::current().id()).cloned()
    }

    /// Transaction type of the current thread's unit of work.
    pub fn transaction_type(&self) -> TransactionResult<TxType> {
        self.inner
            .units
            .lock()
            .get(&thread::current().id())
            .map(UnitOfWork::tx_type)
            .ok_or(TransactionError::NoUnitOfWork)
    }

    /// Mark a pool as touched by the current unit and return the unit's
    /// transaction type.
    pub(crate) fn activate(&self, index: usize) -> TransactionResult<TxType> {
        let mut units = self.inner.units.lock();
        let unit = units
            .get_mut(&thread::current().id())
            .ok_or(TransactionError::NoUnitOfWork)?;
        if unit.touched.insert(index) {
            debug!(unit = %unit.id, index, "pool joined unit of work");
        }
        Ok(unit.tx_type())
    }

    fn take_unit(&self) -> TransactionResult<UnitOfWork> {
        self.inner
            .units
            .lock()
            .remove(&thread::current().id())
            .ok_or(TransactionError::NoUnitOfWork)
    }

    /// End the current unit of work, committing every touched pool.
    ///
    /// Every pool gets its commit attempt even after an earlier one failed.
    /// If any failed, all touched pools are rolled back and the failure of
    /// the last failing pool in registration order is returned. A pool
    /// whose connection was closed counts as a failed commit.
    pub fn end(&self) -> TransactionResult<()> {
        let unit = self.take_unit()?;
        let pools = self.inner.registry.read().select(&unit.touched);

        let mut last_failure = None;
        for pool in &pools {
            if let Err(e) = pool.commit() {
                warn!(unit = %unit.id, pool = %pool.db_type(), error = %e, "commit failed");
                last_failure = Some(e);
            }
        }

        match last_failure {
            None => {
                debug!(unit = %unit.id, pools = pools.len(), "unit of work committed");
                Ok(())
            }
            Some(e) => {
                // Pools that committed hold no connection any more; only the
                // failed ones are affected.
                self.rollback_pools(&unit, &pools);
                Err(e)
            }
        }
    }

    /// End the current unit of work, rolling back every touched pool.
    ///
    /// Every pool gets its rollback attempt; the last rollback failure, if
    /// any, is returned.
    pub fn rollback(&self) -> TransactionResult<()> {
        let unit = self.take_unit()?;
        let pools = self.inner.registry.read().select(&unit.touched);
        match self.rollback_pools(&unit, &pools) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// End the current unit of work after its body failed with `kind`.
    ///
    /// The unit's config decides the outcome. A commit failure is returned
    /// as an error; rollback failures are only logged, since the caller
    /// reports the body's own error.
    pub fn end_with_error(&self, kind: &ErrorKind) -> TransactionResult<Outcome> {
        let outcome = {
            let units = self.inner.units.lock();
            let unit = units
                .get(&thread::current().id())
                .ok_or(TransactionError::NoUnitOfWork)?;
            unit.config.outcome_for(kind)
        };
        debug!(kind = %kind, ?outcome, "unit of work failed");

        match outcome {
            Outcome::Commit => self.end().map(|_| outcome),
            Outcome::Rollback => {
                let unit = self.take_unit()?;
                let pools = self.inner.registry.read().select(&unit.touched);
                self.rollback_pools(&unit, &pools);
                Ok(outcome)
            }
        }
    }

    fn rollback_pools(
        &self,
        unit: &UnitOfWork,
        pools: &[Arc<dyn PoolManager>],
    ) -> Option<TransactionError> {
        let mut last_failure = None;
        for pool in pools {
            if let Err(e) = pool.rollback() {
                warn!(unit = %unit.id, pool = %pool.db_type(), error = %e, "rollback failed");
                last_failure = Some(e);
            }
        }
        debug!(unit = %unit.id, pools = pools.len(), "unit of work rolled back");
        last_failure
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("pools", &self.inner.registry.read().db_types())
            .field("active_count", &self.active_count())
            .finish()
    }
}
