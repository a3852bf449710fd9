//! Storage module for persistent DAG data
//!
//! - `Database`: byte-blob key-value boundary, split into keyspaces
//! - `MemoryDatabase`: in-process backend for tests and embedding
//! - `RocksDatabase`: RocksDB backend, one column family per keyspace
//! - `StateDb`: typed accessors for vertices, statuses, and conflict owners

pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocksdb;
pub mod state_db;

pub use memory::MemoryDatabase;
#[cfg(feature = "rocksdb-backend")]
pub use self::rocksdb::RocksDatabase;
pub use state_db::StateDb;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use std::sync::Arc;

/// Logical partition of the key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyspace {
    /// Vertex encodings keyed by vertex ID
    Vertices,
    /// Vertex status keyed by vertex ID
    VertexStatus,
    /// Transition status keyed by transition ID
    TransitionStatus,
    /// Accepted owner keyed by input ID
    Conflicts,
    /// Singletons such as the accepted frontier
    Metadata,
}

impl Keyspace {
    pub const ALL: [Keyspace; 5] = [
        Keyspace::Vertices,
        Keyspace::VertexStatus,
        Keyspace::TransitionStatus,
        Keyspace::Conflicts,
        Keyspace::Metadata,
    ];

    /// Column family name
    pub fn name(&self) -> &'static str {
        match self {
            Keyspace::Vertices => "vertices",
            Keyspace::VertexStatus => "vertex_status",
            Keyspace::TransitionStatus => "transition_status",
            Keyspace::Conflicts => "conflicts",
            Keyspace::Metadata => "metadata",
        }
    }
}

/// Single mutation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { space: Keyspace, key: Vec<u8>, value: Vec<u8> },
    Delete { space: Keyspace, key: Vec<u8> },
}

/// Group of mutations applied atomically
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, space: Keyspace, key: &[u8], value: &[u8]) {
        self.ops.push(BatchOp::Put {
            space,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    pub fn delete(&mut self, space: Keyspace, key: &[u8]) {
        self.ops.push(BatchOp::Delete {
            space,
            key: key.to_vec(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Byte-blob key-value store.
///
/// Failures are surfaced to the caller; nothing here retries.
pub trait Database: Send + Sync {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, space: Keyspace, key: &[u8]) -> Result<()>;

    /// Apply every operation of `batch` or none of them
    fn write(&self, batch: WriteBatch) -> Result<()>;

    fn has(&self, space: Keyspace, key: &[u8]) -> Result<bool> {
        Ok(self.get(space, key)?.is_some())
    }
}

/// Open the backend selected by `config`
pub fn open_database(config: &StorageConfig) -> Result<Arc<dyn Database>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryDatabase::new())),
        #[cfg(feature = "rocksdb-backend")]
        StorageBackend::Rocksdb => Ok(Arc::new(RocksDatabase::open_with_config(config)?)),
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackend::Rocksdb => Err(crate::error::DagError::Config(
            "RocksDB backend requires the rocksdb-backend feature".to_string(),
        )),
    }
}
