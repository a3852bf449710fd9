//! Vertex wire/storage encoding
//!
//! Layout (bincode, fixed-width big-endian integers, no trailing bytes):
//!
//! ```text
//! version: u16
//! epoch: u32
//! parents: u64 len, then 32-byte IDs in ascending order
//! transitions: u64 len, then per entry
//!     tag u32 = 0 Embedded -> u64 len + bytes
//!     tag u32 = 1 Referenced -> 32-byte ID
//! ```

use crate::config::SerializerConfig;
use crate::error::{DagError, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use snowdag_core::{TransitionId, VertexId};

/// Current encoding version
pub const CODEC_VERSION: u16 = 0;

/// How a vertex carries one transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodedTransition {
    /// Full transition bytes, parsed by the VM on decode
    Embedded(Vec<u8>),
    /// Bare ID of a transition the VM already knows
    Referenced(TransitionId),
}

/// Decoded vertex fields before transitions are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnparsedVertex {
    pub version: u16,
    pub epoch: u32,
    pub parents: Vec<VertexId>,
    pub transitions: Vec<EncodedTransition>,
}

/// Encoder/decoder enforcing size and shape limits
#[derive(Debug, Clone)]
pub struct VertexCodec {
    max_parents: usize,
    max_transitions: usize,
    max_vertex_bytes: usize,
}

impl VertexCodec {
    pub fn new(config: &SerializerConfig) -> Self {
        Self {
            max_parents: config.max_parents,
            max_transitions: config.max_transitions,
            max_vertex_bytes: config.max_vertex_bytes,
        }
    }

    fn options(&self) -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_big_endian()
            .with_limit(self.max_vertex_bytes as u64)
            .reject_trailing_bytes()
    }

    pub fn encode(&self, vertex: &UnparsedVertex) -> Result<Vec<u8>> {
        self.check_shape(vertex)?;
        self.options().serialize(vertex).map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => DagError::InvalidVertex(format!(
                "Encoded vertex exceeds {} bytes",
                self.max_vertex_bytes
            )),
            other => DagError::Encode(other.to_string()),
        })
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<UnparsedVertex> {
        if bytes.len() > self.max_vertex_bytes {
            return Err(DagError::Decode(format!(
                "Vertex is {} bytes, limit is {}",
                bytes.len(),
                self.max_vertex_bytes
            )));
        }

        let vertex: UnparsedVertex = self
            .options()
            .deserialize(bytes)
            .map_err(|e| DagError::Decode(e.to_string()))?;

        self.check_shape(&vertex)
            .map_err(|e| DagError::Decode(e.to_string()))?;
        Ok(vertex)
    }

    /// Canonical-form checks shared by both directions
    fn check_shape(&self, vertex: &UnparsedVertex) -> Result<()> {
        if vertex.version != CODEC_VERSION {
            return Err(DagError::InvalidVertex(format!(
                "Unsupported codec version {}",
                vertex.version
            )));
        }

        if vertex.parents.len() > self.max_parents {
            return Err(DagError::InvalidVertex(format!(
                "Vertex has {} parents, limit is {}",
                vertex.parents.len(),
                self.max_parents
            )));
        }

        if vertex.parents.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(DagError::InvalidVertex(
                "Parent IDs must be sorted and unique".to_string(),
            ));
        }

        if vertex.transitions.is_empty() {
            return Err(DagError::InvalidVertex("Vertex has no transitions".to_string()));
        }

        if vertex.transitions.len() > self.max_transitions {
            return Err(DagError::InvalidVertex(format!(
                "Vertex has {} transitions, limit is {}",
                vertex.transitions.len(),
                self.max_transitions
            )));
        }

        Ok(())
    }
}
