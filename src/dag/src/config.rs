//! Serializer configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Limits and storage settings for the vertex serializer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerializerConfig {
    /// Highest epoch a vertex may carry
    #[serde(default = "default_max_epoch")]
    pub max_epoch: u32,

    /// Maximum parent references per vertex
    #[serde(default = "default_max_parents")]
    pub max_parents: usize,

    /// Maximum transition entries per vertex
    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,

    /// Maximum encoded vertex size in bytes
    #[serde(default = "default_max_vertex_bytes")]
    pub max_vertex_bytes: usize,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backing store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

/// RocksDB compaction style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactionStyle {
    Level,
    Universal,
    Fifo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_write_buffer")]
    pub write_buffer_size: usize,
    #[serde(default = "default_max_files")]
    pub max_open_files: i32,
    #[serde(default = "default_true")]
    pub enable_wal: bool,
    #[serde(default = "default_compaction_style")]
    pub compaction_style: CompactionStyle,
}

// Default value functions
fn default_true() -> bool { true }
fn default_max_epoch() -> u32 { u32::MAX }
fn default_max_parents() -> usize { 128 }
fn default_max_transitions() -> usize { 1024 }
fn default_max_vertex_bytes() -> usize { 2 * 1024 * 1024 }
fn default_backend() -> StorageBackend { StorageBackend::Memory }
fn default_path() -> PathBuf { PathBuf::from("./data/dag") }
fn default_write_buffer() -> usize { 64 * 1024 * 1024 }
fn default_max_files() -> i32 { 1000 }
fn default_compaction_style() -> CompactionStyle { CompactionStyle::Level }

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            max_epoch: default_max_epoch(),
            max_parents: default_max_parents(),
            max_transitions: default_max_transitions(),
            max_vertex_bytes: default_max_vertex_bytes(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            write_buffer_size: default_write_buffer(),
            max_open_files: default_max_files(),
            enable_wal: default_true(),
            compaction_style: default_compaction_style(),
        }
    }
}

impl SerializerConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {}", path.as_ref().display()))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SerializerConfig = toml::from_str(contents)
            .context("Failed to parse configuration file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_parents == 0 {
            anyhow::bail!("max_parents must be at least 1");
        }

        if self.max_transitions == 0 {
            anyhow::bail!("max_transitions must be at least 1");
        }

        // Room for the fixed header and one referenced transition
        if self.max_vertex_bytes < 64 {
            anyhow::bail!("max_vertex_bytes must be at least 64");
        }

        if self.storage.backend == StorageBackend::Rocksdb && self.storage.path.as_os_str().is_empty() {
            anyhow::bail!("RocksDB storage requires a path");
        }

        Ok(())
    }
}
