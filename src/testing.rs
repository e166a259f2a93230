//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::pool::{ConnectionSource, PoolManager};
use crate::storage::{Credentials, DbType, StorageError, TxType};
use crate::transaction::{TransactionError, TransactionResult};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Where a recording pool's connection ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Open,
    Committed,
    CommitFailed,
    RolledBack,
    Closed,
}

/// Handle returned by [`RecordingPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingConnection {
    pub db_type: DbType,
    pub tx_type: TxType,
}

/// A pool that records what the manager asked of it.
///
/// Unlike [`Pool`](crate::pool::Pool) it keeps its handle after a failed
/// commit, so the manager's rollback pass is observable.
pub struct RecordingPool {
    db_type: DbType,
    inner: Mutex<Recorder>,
}

#[derive(Default)]
struct Recorder {
    state: Option<PoolState>,
    handle: Option<TxType>,
    started: bool,
    fail_commit: bool,
    fail_rollback: bool,
    lost: bool,
    commits: usize,
    rollbacks: usize,
    journal: Vec<(u64, &'static str)>,
}

impl Recorder {
    fn record(&mut self, event: &'static str) {
        self.journal.push((SEQUENCE.fetch_add(1, Ordering::SeqCst), event));
    }
}

impl RecordingPool {
    pub fn new(db_type: DbType) -> Self {
        Self {
            db_type,
            inner: Mutex::new(Recorder::default()),
        }
    }

    pub fn fail_commit(&self) {
        self.inner.lock().fail_commit = true;
    }

    pub fn fail_rollback(&self) {
        self.inner.lock().fail_rollback = true;
    }

    /// Simulate user code closing the connection mid-transaction.
    pub fn lose_connection(&self) {
        self.inner.lock().lost = true;
    }

    pub fn state(&self) -> PoolState {
        self.inner.lock().state.unwrap_or(PoolState::Idle)
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().started
    }

    pub fn has_connection(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    pub fn commits(&self) -> usize {
        self.inner.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.lock().rollbacks
    }

    /// Events of several pools merged in the order they happened.
    pub fn journal_of(pools: &[&std::sync::Arc<RecordingPool>]) -> Vec<(DbType, &'static str)> {
        let mut events: Vec<(u64, DbType, &'static str)> = pools
            .iter()
            .flat_map(|pool| {
                let db_type = pool.db_type;
                let journal = pool.inner.lock().journal.clone();
                journal
                    .into_iter()
                    .map(move |(seq, event)| (seq, db_type, event))
            })
            .collect();
        events.sort_by_key(|(seq, _, _)| *seq);
        events
            .into_iter()
            .map(|(_, db_type, event)| (db_type, event))
            .collect()
    }
}

impl PoolManager for RecordingPool {
    fn db_type(&self) -> DbType {
        self.db_type
    }

    fn start(&self, _credentials: &Credentials) -> TransactionResult<()> {
        let mut inner = self.inner.lock();
        if !inner.started {
            inner.started = true;
            inner.record("start");
        }
        Ok(())
    }

    fn stop(&self) -> TransactionResult<()> {
        let mut inner = self.inner.lock();
        if inner.handle.is_some() {
            return Err(TransactionError::misuse("stopped with open connection"));
        }
        inner.started = false;
        inner.record("stop");
        Ok(())
    }

    fn commit(&self) -> TransactionResult<()> {
        let mut inner = self.inner.lock();
        if inner.handle.is_none() {
            return Ok(());
        }
        let pool = self.db_type;
        if inner.lost {
            inner.handle = None;
            inner.state = Some(PoolState::Closed);
            inner.record("consistency");
            return Err(TransactionError::Consistency { pool });
        }
        if inner.fail_commit {
            inner.state = Some(PoolState::CommitFailed);
            inner.record("commit-failed");
            return Err(TransactionError::Commit {
                pool,
                source: StorageError::TransactionFailed {
                    db_type: pool,
                    reason: "injected".into(),
                },
            });
        }
        inner.handle = None;
        inner.state = Some(PoolState::Committed);
        inner.commits += 1;
        inner.record("commit");
        Ok(())
    }

    fn rollback(&self) -> TransactionResult<()> {
        let mut inner = self.inner.lock();
        if inner.handle.take().is_none() {
            return Ok(());
        }
        let pool = self.db_type;
        if inner.fail_rollback {
            inner.record("rollback-failed");
            return Err(TransactionError::Rollback {
                pool,
                source: StorageError::TransactionFailed {
                    db_type: pool,
                    reason: "injected".into(),
                },
            });
        }
        inner.state = Some(PoolState::RolledBack);
        inner.rollbacks += 1;
        inner.record("rollback");
        Ok(())
    }

    fn close_connection(&self) {
        let mut inner = self.inner.lock();
        if inner.handle.take().is_some() {
            inner.state = Some(PoolState::Closed);
            inner.record("close");
        }
    }
}

impl ConnectionSource for RecordingPool {
    type Connection = RecordingConnection;

    fn connection(&self, tx_type: TxType) -> TransactionResult<RecordingConnection> {
        let mut inner = self.inner.lock();
        let tx_type = *inner.handle.get_or_insert(tx_type);
        inner.state = Some(PoolState::Open);
        Ok(RecordingConnection {
            db_type: self.db_type,
            tx_type,
        })
    }
}
