//! # Snowdag Core
//!
//! Shared identifier, status, and error types for the snowdag workspace.
//! Kept separate so collaborators (VMs, storage backends, the voting engine)
//! can depend on the vocabulary without pulling in the vertex layer.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{Id, Status, TransitionId, VertexId, ID_LEN};
