//! Ordered set of pools known to a transaction manager.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::pool::manager::PoolManager;
use crate::storage::DbType;

struct PoolEntry {
    pool: Arc<dyn PoolManager>,
    /// Same pool, kept for typed lookup.
    typed: Arc<dyn Any + Send + Sync>,
}

/// Registered pools in registration order.
///
/// A pool's index never changes once registered; units of work record
/// the indices of the pools they touch.
#[derive(Default)]
pub struct PoolRegistry {
    entries: Vec<PoolEntry>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pool and return its index.
    pub fn register<P: PoolManager>(&mut self, pool: Arc<P>) -> usize {
        self.entries.push(PoolEntry {
            pool: pool.clone(),
            typed: pool,
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All pools in registration order.
    pub fn pools(&self) -> Vec<Arc<dyn PoolManager>> {
        self.entries.iter().map(|entry| entry.pool.clone()).collect()
    }

    /// The pools at `indices`, in registration order.
    pub fn select(&self, indices: &BTreeSet<usize>) -> Vec<Arc<dyn PoolManager>> {
        indices
            .iter()
            .filter_map(|index| self.entries.get(*index))
            .map(|entry| entry.pool.clone())
            .collect()
    }

    /// First registered pool of concrete type `P`.
    pub fn find<P: PoolManager>(&self) -> Option<(usize, Arc<P>)> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            entry
                .typed
                .clone()
                .downcast::<P>()
                .ok()
                .map(|pool| (index, pool))
        })
    }

    pub fn db_types(&self) -> Vec<DbType> {
        self.entries.iter().map(|entry| entry.pool.db_type()).collect()
    }
}
