//! Typed view over a [`Database`]

use super::{Database, Keyspace, WriteBatch};
use crate::error::{DagError, Result};
use snowdag_core::{Id, Status, TransitionId, VertexId, ID_LEN};
use std::sync::Arc;

const EDGE_KEY: &[u8] = b"edge";

/// Persistence of vertices, statuses, conflict owners, and the frontier
#[derive(Clone)]
pub struct StateDb {
    db: Arc<dyn Database>,
}

impl StateDb {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn vertex_bytes(&self, id: &VertexId) -> Result<Option<Vec<u8>>> {
        self.db.get(Keyspace::Vertices, id.as_bytes())
    }

    /// Store the encoding and status of a vertex together
    pub fn put_vertex(&self, id: &VertexId, bytes: &[u8], status: Status) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(Keyspace::Vertices, id.as_bytes(), bytes);
        batch.put(Keyspace::VertexStatus, id.as_bytes(), &[status.to_byte()]);
        self.db.write(batch)
    }

    /// Stored vertex status, `Unknown` when never persisted
    pub fn vertex_status(&self, id: &VertexId) -> Result<Status> {
        read_status(self.db.get(Keyspace::VertexStatus, id.as_bytes())?)
    }

    /// Stored transition status, `Unknown` when never decided
    pub fn transition_status(&self, id: &TransitionId) -> Result<Status> {
        read_status(self.db.get(Keyspace::TransitionStatus, id.as_bytes())?)
    }

    /// Transition that consumed `input`, if one was accepted
    pub fn conflict_owner(&self, input: &Id) -> Result<Option<TransitionId>> {
        self.db
            .get(Keyspace::Conflicts, input.as_bytes())?
            .map(|bytes| Id::from_slice(&bytes).map_err(DagError::from))
            .transpose()
    }

    /// Persist an acceptance: the status and the owner of every input, atomically
    pub fn accept_transition(&self, id: &TransitionId, inputs: &[Id]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(Keyspace::TransitionStatus, id.as_bytes(), &[Status::Accepted.to_byte()]);
        for input in inputs {
            batch.put(Keyspace::Conflicts, input.as_bytes(), id.as_bytes());
        }
        self.db.write(batch)
    }

    pub fn reject_transition(&self, id: &TransitionId) -> Result<()> {
        self.db.put(
            Keyspace::TransitionStatus,
            id.as_bytes(),
            &[Status::Rejected.to_byte()],
        )
    }

    /// Accepted frontier of the DAG
    pub fn edge(&self) -> Result<Vec<VertexId>> {
        let Some(bytes) = self.db.get(Keyspace::Metadata, EDGE_KEY)? else {
            return Ok(Vec::new());
        };
        if bytes.len() % ID_LEN != 0 {
            return Err(DagError::Decode(format!("Edge record has invalid length {}", bytes.len())));
        }
        bytes
            .chunks_exact(ID_LEN)
            .map(|chunk| Id::from_slice(chunk).map_err(DagError::from))
            .collect()
    }

    pub fn set_edge(&self, ids: &[VertexId]) -> Result<()> {
        let bytes: Vec<u8> = ids.iter().flat_map(|id| id.as_bytes().iter().copied()).collect();
        self.db.put(Keyspace::Metadata, EDGE_KEY, &bytes)
    }
}

fn read_status(bytes: Option<Vec<u8>>) -> Result<Status> {
    match bytes.as_deref() {
        None => Ok(Status::Unknown),
        Some([byte]) => Ok(Status::from_byte(*byte)?),
        Some(other) => Err(DagError::Decode(format!("Status record has invalid length {}", other.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDatabase;

    fn state_db() -> (StateDb, Arc<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        (StateDb::new(db.clone()), db)
    }

    #[test]
    fn test_vertex_round_trip() {
        let (state, _) = state_db();
        let id = Id::from_data(b"vertex");

        assert!(state.vertex_bytes(&id).unwrap().is_none());
        assert_eq!(state.vertex_status(&id).unwrap(), Status::Unknown);

        state.put_vertex(&id, b"encoded", Status::Processing).unwrap();
        assert_eq!(state.vertex_bytes(&id).unwrap(), Some(b"encoded".to_vec()));
        assert_eq!(state.vertex_status(&id).unwrap(), Status::Processing);
    }

    #[test]
    fn test_accept_records_conflict_owners() {
        let (state, _) = state_db();
        let tx = Id::from_data(b"tx");
        let inputs = [Id::from_data(b"utxo-1"), Id::from_data(b"utxo-2")];

        state.accept_transition(&tx, &inputs).unwrap();

        assert_eq!(state.transition_status(&tx).unwrap(), Status::Accepted);
        for input in &inputs {
            assert_eq!(state.conflict_owner(input).unwrap(), Some(tx));
        }
        assert!(state.conflict_owner(&Id::EMPTY).unwrap().is_none());
    }

    #[test]
    fn test_reject_has_no_conflict_record() {
        let (state, db) = state_db();
        let tx = Id::from_data(b"tx");

        state.reject_transition(&tx).unwrap();
        assert_eq!(state.transition_status(&tx).unwrap(), Status::Rejected);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_edge() {
        let (state, _) = state_db();
        assert!(state.edge().unwrap().is_empty());

        let ids = vec![Id::EMPTY.prefix(1), Id::EMPTY.prefix(2)];
        state.set_edge(&ids).unwrap();
        assert_eq!(state.edge().unwrap(), ids);
    }

    #[test]
    fn test_corrupt_status_is_decode_error() {
        let (state, db) = state_db();
        let id = Id::from_data(b"tx");
        db.put(Keyspace::TransitionStatus, id.as_bytes(), &[1, 2]).unwrap();

        assert!(matches!(state.transition_status(&id), Err(DagError::Decode(_))));
    }
}
