//! In-memory multi-model database.
//!
//! One [`MemoryStorage`] holds a set of named clusters of JSON records.
//! Document, object and graph connections are three views over those
//! same clusters, so a record saved through one view is visible through
//! the others once committed.
//!
//! Transactional connections buffer their writes and apply them under a
//! single write lock on commit. `NOTX` connections write through.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::client::{ConnectionFactory, DbConnection};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Credentials, DbType, TxType};

/// Uri scheme served by [`MemoryStorage`].
pub const MEMORY_SCHEME: &str = "memory";

/// Cluster holding graph vertices.
pub const VERTEX_CLUSTER: &str = "V";

/// Cluster holding graph edges.
pub const EDGE_CLUSTER: &str = "E";

type Cluster = BTreeMap<String, Value>;

/// A named in-memory database shared by all connection views.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    name: String,
    users: RwLock<HashMap<String, String>>,
    clusters: RwLock<BTreeMap<String, Cluster>>,
    /// Remaining injected failures per view and operation.
    faults: Mutex<HashMap<(DbType, Fault), usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Fault {
    Commit,
    Rollback,
}

#[derive(Debug, Clone)]
enum Op {
    Put {
        cluster: String,
        id: String,
        value: Value,
    },
    Remove {
        cluster: String,
        id: String,
    },
}

impl Op {
    fn targets(&self, cluster: &str, id: &str) -> bool {
        match self {
            Op::Put { cluster: c, id: i, .. } | Op::Remove { cluster: c, id: i } => {
                c == cluster && i == id
            }
        }
    }

    fn apply_to(self, clusters: &mut BTreeMap<String, Cluster>) {
        match self {
            Op::Put { cluster, id, value } => {
                clusters.entry(cluster).or_default().insert(id, value);
            }
            Op::Remove { cluster, id } => {
                if let Some(records) = clusters.get_mut(&cluster) {
                    records.remove(&id);
                }
            }
        }
    }
}

impl MemoryStorage {
    /// Create an empty database with the default `admin`/`admin` login.
    pub fn new(name: impl Into<String>) -> Self {
        let mut users = HashMap::new();
        users.insert("admin".to_string(), "admin".to_string());

        Self {
            inner: Arc::new(StorageInner {
                name: name.into(),
                users: RwLock::new(users),
                clusters: RwLock::new(BTreeMap::new()),
                faults: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Uri that connection factories must be configured with.
    pub fn uri(&self) -> String {
        format!("{}:{}", MEMORY_SCHEME, self.inner.name)
    }

    /// Register a login.
    pub fn add_user(&self, user: impl Into<String>, password: impl Into<String>) {
        self.inner.users.write().insert(user.into(), password.into());
    }

    pub fn document_factory(&self) -> DocumentFactory {
        MemoryFactory::new(self.inner.clone())
    }

    pub fn object_factory(&self) -> ObjectFactory {
        MemoryFactory::new(self.inner.clone())
    }

    pub fn graph_factory(&self) -> GraphFactory {
        MemoryFactory::new(self.inner.clone())
    }

    /// Make the next `count` commits through the given view fail.
    pub fn fail_next_commits(&self, db_type: DbType, count: usize) {
        self.inner.faults.lock().insert((db_type, Fault::Commit), count);
    }

    /// Make the next `count` rollbacks through the given view fail.
    pub fn fail_next_rollbacks(&self, db_type: DbType, count: usize) {
        self.inner.faults.lock().insert((db_type, Fault::Rollback), count);
    }

    /// Read a committed record, bypassing any connection.
    pub fn record(&self, cluster: &str, id: &str) -> Option<Value> {
        self.inner.read(cluster, id)
    }

    /// Number of committed records in a cluster.
    pub fn count(&self, cluster: &str) -> usize {
        self.inner
            .clusters
            .read()
            .get(cluster)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

impl StorageInner {
    fn authenticate(&self, credentials: &Credentials) -> StorageResult<()> {
        match self.users.read().get(&credentials.user) {
            Some(password) if *password == credentials.password => Ok(()),
            _ => Err(StorageError::AuthenticationFailed {
                user: credentials.user.clone(),
            }),
        }
    }

    fn take_fault(&self, db_type: DbType, fault: Fault) -> bool {
        let mut faults = self.faults.lock();
        match faults.get_mut(&(db_type, fault)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn apply(&self, ops: Vec<Op>) {
        let mut clusters = self.clusters.write();
        for op in ops {
            op.apply_to(&mut clusters);
        }
    }

    fn read(&self, cluster: &str, id: &str) -> Option<Value> {
        self.clusters
            .read()
            .get(cluster)
            .and_then(|records| records.get(id))
            .cloned()
    }

    fn scan(&self, cluster: &str) -> Cluster {
        self.clusters.read().get(cluster).cloned().unwrap_or_default()
    }
}

/// A raw connection to a [`MemoryStorage`]; wrapped by the typed views.
#[derive(Clone)]
pub struct MemoryConnection {
    db_type: DbType,
    storage: Arc<StorageInner>,
    state: Arc<Mutex<ConnectionState>>,
}

struct ConnectionState {
    tx_type: TxType,
    pending: Vec<Op>,
    closed: bool,
}

impl MemoryConnection {
    fn new(db_type: DbType, storage: Arc<StorageInner>, tx_type: TxType) -> Self {
        Self {
            db_type,
            storage,
            state: Arc::new(Mutex::new(ConnectionState {
                tx_type,
                pending: Vec::new(),
                closed: false,
            })),
        }
    }

    fn write(&self, op: Op) -> StorageResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StorageError::ConnectionClosed(self.db_type));
        }
        if state.tx_type.is_transactional() {
            state.pending.push(op);
        } else {
            self.storage.apply(vec![op]);
        }
        Ok(())
    }

    /// Read a record, seeing this connection's own uncommitted writes.
    fn read(&self, cluster: &str, id: &str) -> StorageResult<Option<Value>> {
        let state = self.state.lock();
        if state.closed {
            return Err(StorageError::ConnectionClosed(self.db_type));
        }
        if let Some(op) = state.pending.iter().rev().find(|op| op.targets(cluster, id)) {
            return Ok(match op {
                Op::Put { value, .. } => Some(value.clone()),
                Op::Remove { .. } => None,
            });
        }
        Ok(self.storage.read(cluster, id))
    }

    fn scan(&self, cluster: &str) -> StorageResult<Cluster> {
        let state = self.state.lock();
        if state.closed {
            return Err(StorageError::ConnectionClosed(self.db_type));
        }
        let mut records = self.storage.scan(cluster);
        for op in state.pending.iter() {
            match op {
                Op::Put { cluster: c, id, value } if c == cluster => {
                    records.insert(id.clone(), value.clone());
                }
                Op::Remove { cluster: c, id } if c == cluster => {
                    records.remove(id);
                }
                _ => {}
            }
        }
        Ok(records)
    }

    fn put(&self, cluster: &str, id: &str, value: Value) -> StorageResult<()> {
        self.write(Op::Put {
            cluster: cluster.to_string(),
            id: id.to_string(),
            value,
        })
    }

    fn remove(&self, cluster: &str, id: &str) -> StorageResult<()> {
        if self.read(cluster, id)?.is_none() {
            return Err(StorageError::RecordNotFound {
                cluster: cluster.to_string(),
                id: id.to_string(),
            });
        }
        self.write(Op::Remove {
            cluster: cluster.to_string(),
            id: id.to_string(),
        })
    }

    /// Number of writes waiting for commit.
    pub fn pending_writes(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl DbConnection for MemoryConnection {
    fn tx_type(&self) -> TxType {
        self.state.lock().tx_type
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn commit(&self) -> StorageResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StorageError::ConnectionClosed(self.db_type));
        }
        if self.storage.take_fault(self.db_type, Fault::Commit) {
            return Err(StorageError::TransactionFailed {
                db_type: self.db_type,
                reason: "commit rejected by storage".into(),
            });
        }
        let ops = std::mem::take(&mut state.pending);
        self.storage.apply(ops);
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.pending.clear();
        if self.storage.take_fault(self.db_type, Fault::Rollback) {
            return Err(StorageError::TransactionFailed {
                db_type: self.db_type,
                reason: "rollback rejected by storage".into(),
            });
        }
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.closed = true;
    }
}

/// A typed view over [`MemoryConnection`].
pub trait MemoryView: DbConnection {
    const DB_TYPE: DbType;

    fn from_connection(connection: MemoryConnection) -> Self;

    fn connection(&self) -> &MemoryConnection;
}

macro_rules! memory_view {
    ($view:ident, $db_type:expr) => {
        impl MemoryView for $view {
            const DB_TYPE: DbType = $db_type;

            fn from_connection(connection: MemoryConnection) -> Self {
                Self(connection)
            }

            fn connection(&self) -> &MemoryConnection {
                &self.0
            }
        }

        impl DbConnection for $view {
            fn tx_type(&self) -> TxType {
                self.0.tx_type()
            }

            fn is_closed(&self) -> bool {
                self.0.is_closed()
            }

            fn commit(&self) -> StorageResult<()> {
                self.0.commit()
            }

            fn rollback(&self) -> StorageResult<()> {
                self.0.rollback()
            }

            fn close(&self) {
                self.0.close()
            }
        }
    };
}

/// Document view: schemaless JSON records grouped by class.
#[derive(Clone)]
pub struct DocumentConnection(MemoryConnection);

memory_view!(DocumentConnection, DbType::Document);

impl DocumentConnection {
    pub fn save(&self, class: &str, id: &str, document: Value) -> StorageResult<()> {
        self.0.put(class, id, document)
    }

    pub fn load(&self, class: &str, id: &str) -> StorageResult<Option<Value>> {
        self.0.read(class, id)
    }

    pub fn delete(&self, class: &str, id: &str) -> StorageResult<()> {
        self.0.remove(class, id)
    }

    /// All documents of a class, ordered by id.
    pub fn browse(&self, class: &str) -> StorageResult<Vec<(String, Value)>> {
        Ok(self.0.scan(class)?.into_iter().collect())
    }

    pub fn count(&self, class: &str) -> StorageResult<usize> {
        Ok(self.0.scan(class)?.len())
    }
}

/// Object view: typed entities serialized through serde.
#[derive(Clone)]
pub struct ObjectConnection(MemoryConnection);

memory_view!(ObjectConnection, DbType::Object);

impl ObjectConnection {
    pub fn save<T: Serialize>(&self, class: &str, id: &str, entity: &T) -> StorageResult<()> {
        let value = serde_json::to_value(entity)?;
        self.0.put(class, id, value)
    }

    pub fn load<T: DeserializeOwned>(&self, class: &str, id: &str) -> StorageResult<Option<T>> {
        match self.0.read(class, id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, class: &str, id: &str) -> StorageResult<()> {
        self.0.remove(class, id)
    }

    pub fn count(&self, class: &str) -> StorageResult<usize> {
        Ok(self.0.scan(class)?.len())
    }
}

/// A directed, labelled edge between two vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub label: String,
    pub to: String,
}

impl Edge {
    fn record_id(&self) -> String {
        format!("{}-{}->{}", self.from, self.label, self.to)
    }
}

/// Graph view: vertices and edges stored in the `V` and `E` clusters.
#[derive(Clone)]
pub struct GraphConnection(MemoryConnection);

memory_view!(GraphConnection, DbType::Graph);

impl GraphConnection {
    /// Check if this graph buffers writes until commit.
    pub fn is_transactional(&self) -> bool {
        self.0.tx_type().is_transactional()
    }

    pub fn add_vertex(&self, id: &str, properties: Value) -> StorageResult<()> {
        self.0.put(VERTEX_CLUSTER, id, properties)
    }

    pub fn vertex(&self, id: &str) -> StorageResult<Option<Value>> {
        self.0.read(VERTEX_CLUSTER, id)
    }

    /// Connect two existing vertices.
    pub fn add_edge(&self, from: &str, label: &str, to: &str) -> StorageResult<Edge> {
        for id in [from, to] {
            if self.vertex(id)?.is_none() {
                return Err(StorageError::RecordNotFound {
                    cluster: VERTEX_CLUSTER.to_string(),
                    id: id.to_string(),
                });
            }
        }
        let edge = Edge {
            from: from.to_string(),
            label: label.to_string(),
            to: to.to_string(),
        };
        self.0
            .put(EDGE_CLUSTER, &edge.record_id(), serde_json::to_value(&edge)?)?;
        Ok(edge)
    }

    /// Edges leaving the given vertex.
    pub fn out_edges(&self, from: &str) -> StorageResult<Vec<Edge>> {
        let mut edges = Vec::new();
        for value in self.0.scan(EDGE_CLUSTER)?.into_values() {
            let edge: Edge = serde_json::from_value(value)?;
            if edge.from == from {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    pub fn count_vertices(&self) -> StorageResult<usize> {
        Ok(self.0.scan(VERTEX_CLUSTER)?.len())
    }
}

/// Connection factory for one view of a [`MemoryStorage`].
pub struct MemoryFactory<V> {
    storage: Arc<StorageInner>,
    configured: Mutex<bool>,
    _view: PhantomData<fn() -> V>,
}

pub type DocumentFactory = MemoryFactory<DocumentConnection>;
pub type ObjectFactory = MemoryFactory<ObjectConnection>;
pub type GraphFactory = MemoryFactory<GraphConnection>;

impl<V> MemoryFactory<V> {
    fn new(storage: Arc<StorageInner>) -> Self {
        Self {
            storage,
            configured: Mutex::new(false),
            _view: PhantomData,
        }
    }
}

impl<V: MemoryView> ConnectionFactory for MemoryFactory<V> {
    type Connection = V;

    fn db_type(&self) -> DbType {
        V::DB_TYPE
    }

    fn configure(&self, credentials: &Credentials) -> StorageResult<()> {
        let (scheme, name) = credentials.split_uri()?;
        if scheme != MEMORY_SCHEME {
            return Err(StorageError::InvalidUri(credentials.uri.clone()));
        }
        if name != self.storage.name {
            return Err(StorageError::UnknownDatabase(name.to_string()));
        }
        self.storage.authenticate(credentials)?;
        *self.configured.lock() = true;
        Ok(())
    }

    fn open(&self, tx_type: TxType) -> StorageResult<V> {
        if !*self.configured.lock() {
            return Err(StorageError::NotConfigured(V::DB_TYPE));
        }
        Ok(V::from_connection(MemoryConnection::new(
            V::DB_TYPE,
            self.storage.clone(),
            tx_type,
        )))
    }

    fn release(&self) {
        *self.configured.lock() = false;
    }
}
