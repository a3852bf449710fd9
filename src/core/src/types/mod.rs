//! Shared types for the snowdag workspace

pub mod id;
pub mod status;

// Re-export commonly used types
pub use id::{Id, TransitionId, VertexId, ID_LEN};
pub use status::Status;
