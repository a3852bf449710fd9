//! DAG vertex implementation
//!
//! A vertex is an immutable DAG node: an epoch, a set of parent references,
//! and an ordered list of transitions, each either embedded in full or
//! referenced by ID. Its status is the only field that changes after
//! construction.
//!
//! [`Vertex`] is a cheap handle; the serializer hands out one shared handle
//! per vertex ID while any is alive, so every caller sees the same status.

use crate::error::{DagError, Result};
use crate::serializer::SerializerState;
use crate::transition::Transition;
use crate::tx::Tx;
use parking_lot::RwLock;
use snowdag_core::{Status, TransitionId, VertexId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// How a vertex carries a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Full bytes stored in the vertex
    Embedded,
    /// Only the ID is stored; the VM already knows the transition
    Referenced,
}

/// One transition of a vertex, in list order
#[derive(Debug, Clone)]
pub struct VertexEntry {
    transition: Arc<dyn Transition>,
    mode: EntryMode,
}

impl VertexEntry {
    pub fn embedded(transition: Arc<dyn Transition>) -> Self {
        Self {
            transition,
            mode: EntryMode::Embedded,
        }
    }

    pub fn referenced(transition: Arc<dyn Transition>) -> Self {
        Self {
            transition,
            mode: EntryMode::Referenced,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.transition.id()
    }

    pub fn transition(&self) -> &Arc<dyn Transition> {
        &self.transition
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }
}

pub(crate) struct VertexInner {
    pub(crate) id: VertexId,
    pub(crate) epoch: u32,
    pub(crate) parents: Vec<VertexId>,
    pub(crate) entries: Vec<VertexEntry>,
    pub(crate) bytes: Vec<u8>,
    pub(crate) status: RwLock<Status>,
    pub(crate) state: Arc<SerializerState>,
}

/// Vertex in the DAG
#[derive(Clone)]
pub struct Vertex {
    pub(crate) inner: Arc<VertexInner>,
}

impl Vertex {
    /// Content hash of the encoding
    pub fn id(&self) -> VertexId {
        self.inner.id
    }

    pub fn epoch(&self) -> u32 {
        self.inner.epoch
    }

    /// Parent vertex IDs, ascending
    pub fn parent_ids(&self) -> &[VertexId] {
        &self.inner.parents
    }

    /// Get parent set as HashSet for efficient lookups
    pub fn parent_set(&self) -> HashSet<VertexId> {
        self.inner.parents.iter().copied().collect()
    }

    /// Check if this vertex has no parents
    pub fn is_genesis(&self) -> bool {
        self.inner.parents.is_empty()
    }

    /// Wire/storage encoding
    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    pub fn entries(&self) -> &[VertexEntry] {
        &self.inner.entries
    }

    pub fn transition_ids(&self) -> Vec<TransitionId> {
        self.inner.entries.iter().map(VertexEntry::id).collect()
    }

    pub fn status(&self) -> Status {
        *self.inner.status.read()
    }

    /// One vote unit per transition, in list order.
    ///
    /// Fresh on every call. Every dependency is resolved and every record
    /// loaded before any transition is registered, so a failed call leaves
    /// no trace.
    pub fn txs(&self) -> Result<Vec<Tx>> {
        let state = &self.inner.state;

        let resolved = self
            .inner
            .entries
            .iter()
            .map(|entry| {
                entry
                    .transition
                    .dependencies()
                    .iter()
                    .map(|dep| state.vm.get(dep))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let registrations = self
            .inner
            .entries
            .iter()
            .map(|entry| state.statuses.prepare(entry.transition.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .inner
            .entries
            .iter()
            .zip(resolved)
            .zip(registrations)
            .map(|((entry, dependencies), registration)| {
                Tx::new(
                    entry.transition.clone(),
                    dependencies,
                    registration.commit(),
                    state.statuses.clone(),
                )
            })
            .collect())
    }

    /// Decision implied by the transitions: `Accepted` once all are accepted,
    /// `Rejected` as soon as one is rejected, `None` while undecided.
    pub fn outcome(&self) -> Result<Option<Status>> {
        let mut all_accepted = true;
        for entry in &self.inner.entries {
            match self.inner.state.statuses.status(&entry.id())? {
                Status::Rejected => return Ok(Some(Status::Rejected)),
                Status::Accepted => {}
                _ => all_accepted = false,
            }
        }
        Ok(all_accepted.then_some(Status::Accepted))
    }

    /// Mark the vertex accepted. Every transition must already be accepted;
    /// anything else is a bug in the caller.
    pub fn accept(&self) -> Result<()> {
        let mut status = self.inner.status.write();
        if *status != Status::Processing {
            warn!(vertex = %self.inner.id, status = %*status, "Accept called on decided vertex");
            return Err(DagError::precondition(format!(
                "vertex {} is already {}",
                self.inner.id, *status
            )));
        }

        for entry in &self.inner.entries {
            let tx_status = self.inner.state.statuses.status(&entry.id())?;
            if !tx_status.is_accepted() {
                warn!(vertex = %self.inner.id, transition = %entry.id(), status = %tx_status, "Accept called with undecided transition");
                return Err(DagError::precondition(format!(
                    "vertex {} has transition {} in status {}",
                    self.inner.id,
                    entry.id(),
                    tx_status
                )));
            }
        }

        self.inner
            .state
            .db
            .put_vertex(&self.inner.id, &self.inner.bytes, Status::Accepted)?;
        *status = Status::Accepted;

        info!(vertex = %self.inner.id, epoch = self.inner.epoch, "Vertex accepted");
        Ok(())
    }

    /// Mark the vertex rejected
    pub fn reject(&self) -> Result<()> {
        let mut status = self.inner.status.write();
        if *status != Status::Processing {
            warn!(vertex = %self.inner.id, status = %*status, "Reject called on decided vertex");
            return Err(DagError::precondition(format!(
                "vertex {} is already {}",
                self.inner.id, *status
            )));
        }

        self.inner
            .state
            .db
            .put_vertex(&self.inner.id, &self.inner.bytes, Status::Rejected)?;
        *status = Status::Rejected;

        info!(vertex = %self.inner.id, epoch = self.inner.epoch, "Vertex rejected");
        Ok(())
    }

    /// Store encoding and current status; the read lock keeps a concurrent
    /// decision from being overwritten with a stale status
    pub(crate) fn persist(&self) -> Result<()> {
        let status = self.inner.status.read();
        self.inner
            .state
            .db
            .put_vertex(&self.inner.id, &self.inner.bytes, *status)
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Vertex {}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vertex")
            .field("id", &self.inner.id)
            .field("epoch", &self.inner.epoch)
            .field("parents", &self.inner.parents)
            .field("transitions", &self.transition_ids())
            .field("status", &self.status())
            .finish()
    }
}
