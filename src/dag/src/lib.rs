//! # Snowdag DAG Module
//!
//! Vertex and transition layer of a DAG-based consensus engine.
//!
//! ## Features
//!
//! - **Vertex Serialization**: Build, parse, and load content-addressed vertices
//! - **Vote Units**: One [`Tx`] per transition, sharing a single status record
//! - **Conflict Sets**: Accepting a transition restricts every rival spending the same input
//! - **Persistence**: In-memory or RocksDB storage of vertices and decisions
//!
//! ## Module Structure
//!
//! ```text
//! dag/
//! ├── serializer/  - Vertex construction, parsing, and lookup
//! ├── vertex/      - Vertex handles and decisions
//! ├── tx/          - Per-transition vote units
//! ├── state/       - Transition status store
//! ├── conflicts/   - Conflict sets keyed by input
//! ├── codec/       - Vertex wire encoding
//! └── storage/     - Database trait and backends
//! ```
//!
//! The voting engine itself lives outside this crate: it calls
//! [`Tx::verify`], [`Tx::accept`], [`Tx::reject`], and the matching
//! [`Vertex`] methods as polls conclude.

pub mod codec;
pub mod config;
pub mod conflicts;
pub mod context;
pub mod error;
pub mod serializer;
pub mod state;
pub mod storage;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transition;
pub mod tx;
pub mod vertex;
mod weak_index;

pub use config::{SerializerConfig, StorageBackend, StorageConfig};
pub use context::ChainContext;
pub use error::{DagError, Result, VerificationError};
pub use serializer::Serializer;
pub use storage::{open_database, Database, MemoryDatabase};
pub use transition::{Transition, TransitionStore};
pub use tx::Tx;
pub use vertex::{EntryMode, Vertex, VertexEntry};

pub use snowdag_core::{Id, Status, TransitionId, VertexId};
