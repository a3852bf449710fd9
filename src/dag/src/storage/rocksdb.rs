//! RocksDB database backend
//!
//! One column family per [`Keyspace`], batch writes applied atomically,
//! synchronous writes when the WAL is enabled.

use super::{BatchOp, Database, Keyspace, WriteBatch};
use crate::config::{CompactionStyle, StorageBackend, StorageConfig};
use crate::error::{DagError, Result};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompressionType, Options, WriteBatch as RocksBatch,
    WriteOptions, DB,
};
use std::path::Path;
use tracing::info;

/// Persistent [`Database`] on RocksDB
pub struct RocksDatabase {
    db: DB,
    config: StorageConfig,
}

impl RocksDatabase {
    /// Open or create a database at `path` with default tuning
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StorageConfig {
            backend: StorageBackend::Rocksdb,
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        };
        Self::open_with_config(&config)
    }

    /// Open with custom configuration
    pub fn open_with_config(config: &StorageConfig) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_open_files(config.max_open_files);

        // Set compression
        opts.set_compression_type(DBCompressionType::Lz4);
        opts.set_bottommost_compression_type(DBCompressionType::Zstd);

        // Set compaction style
        match config.compaction_style {
            CompactionStyle::Level => opts.set_compaction_style(rocksdb::DBCompactionStyle::Level),
            CompactionStyle::Universal => opts.set_compaction_style(rocksdb::DBCompactionStyle::Universal),
            CompactionStyle::Fifo => opts.set_compaction_style(rocksdb::DBCompactionStyle::Fifo),
        }

        if config.enable_wal {
            opts.set_max_total_wal_size(1024 * 1024 * 1024); // 1GB
        }

        let cf_descriptors: Vec<_> = Keyspace::ALL
            .iter()
            .map(|space| ColumnFamilyDescriptor::new(space.name(), opts.clone()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| DagError::Storage(format!("Failed to open RocksDB: {}", e)))?;

        info!(path = %config.path.display(), "Opened RocksDB vertex store");

        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    fn cf_handle(&self, space: Keyspace) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(space.name())
            .ok_or_else(|| DagError::Storage(format!("Column family not found: {}", space.name())))
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.enable_wal);
        write_opts.disable_wal(!self.config.enable_wal);
        write_opts
    }

    /// Flush pending writes
    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| DagError::Storage(format!("Flush error: {}", e)))
    }
}

impl Database for RocksDatabase {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(space)?;
        self.db
            .get_cf(cf, key)
            .map_err(|e| DagError::Storage(format!("Read error: {}", e)))
    }

    fn put(&self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf_handle(space)?;
        self.db
            .put_cf_opt(cf, key, value, &self.write_options())
            .map_err(|e| DagError::Storage(format!("Write error: {}", e)))
    }

    fn delete(&self, space: Keyspace, key: &[u8]) -> Result<()> {
        let cf = self.cf_handle(space)?;
        self.db
            .delete_cf_opt(cf, key, &self.write_options())
            .map_err(|e| DagError::Storage(format!("Delete error: {}", e)))
    }

    fn has(&self, space: Keyspace, key: &[u8]) -> Result<bool> {
        let cf = self.cf_handle(space)?;
        self.db
            .get_pinned_cf(cf, key)
            .map(|value| value.is_some())
            .map_err(|e| DagError::Storage(format!("Read error: {}", e)))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut rocks_batch = RocksBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { space, key, value } => {
                    rocks_batch.put_cf(self.cf_handle(space)?, key, value);
                }
                BatchOp::Delete { space, key } => {
                    rocks_batch.delete_cf(self.cf_handle(space)?, key);
                }
            }
        }

        self.db
            .write_opt(rocks_batch, &self.write_options())
            .map_err(|e| DagError::Storage(format!("Write error: {}", e)))
    }
}
