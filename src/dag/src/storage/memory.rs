//! In-memory database backend

use super::{BatchOp, Database, Keyspace, WriteBatch};
use crate::error::{DagError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

type Table = HashMap<(Keyspace, Vec<u8>), Vec<u8>>;

/// Volatile [`Database`] backed by a hash map.
///
/// Once closed every operation fails, which lets tests exercise storage
/// failure paths.
#[derive(Debug)]
pub struct MemoryDatabase {
    inner: RwLock<Option<Table>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Drop all contents and fail subsequent operations
    pub fn close(&self) {
        *self.inner.write() = None;
    }

    /// Number of stored keys across all keyspaces
    pub fn len(&self) -> usize {
        self.inner.read().as_ref().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn closed() -> DagError {
    DagError::Storage("Database closed".to_string())
}

impl Database for MemoryDatabase {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let guard = self.inner.read();
        let table = guard.as_ref().ok_or_else(closed)?;
        Ok(table.get(&(space, key.to_vec())).cloned())
    }

    fn put(&self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let table = guard.as_mut().ok_or_else(closed)?;
        table.insert((space, key.to_vec()), value.to_vec());
        Ok(())
    }

    fn delete(&self, space: Keyspace, key: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let table = guard.as_mut().ok_or_else(closed)?;
        table.remove(&(space, key.to_vec()));
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        // Single write guard makes the batch atomic for readers
        let mut guard = self.inner.write();
        let table = guard.as_mut().ok_or_else(closed)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { space, key, value } => {
                    table.insert((space, key), value);
                }
                BatchOp::Delete { space, key } => {
                    table.remove(&(space, key));
                }
            }
        }
        Ok(())
    }
}
