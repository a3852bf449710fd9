//! Vertex serializer
//!
//! The [`Serializer`] is the entry point of the vertex layer. It builds new
//! vertices, parses vertices received from peers, loads stored vertices, and
//! tracks the accepted frontier. All of it is safe to call from many threads.
//!
//! While any handle to a vertex is alive, `build`, `parse`, and `get` return
//! that same handle, so a decision made through one is seen through all.

use crate::codec::{EncodedTransition, UnparsedVertex, VertexCodec, CODEC_VERSION};
use crate::config::SerializerConfig;
use crate::context::ChainContext;
use crate::error::{DagError, Result};
use crate::state::StatusStore;
use crate::storage::{Database, StateDb};
use crate::transition::{Transition, TransitionStore};
use crate::vertex::{Vertex, VertexEntry, VertexInner};
use crate::weak_index::WeakIndex;
use parking_lot::RwLock;
use snowdag_core::{Id, Status, TransitionId, VertexId};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Collaborators fixed at initialization, shared by every vertex handle
pub(crate) struct SerializerState {
    pub(crate) ctx: ChainContext,
    pub(crate) vm: Arc<dyn TransitionStore>,
    pub(crate) db: StateDb,
    pub(crate) statuses: Arc<StatusStore>,
    codec: VertexCodec,
    max_epoch: u32,
    vertices: WeakIndex<VertexId, VertexInner>,
}

impl SerializerState {
    fn new(
        config: &SerializerConfig,
        ctx: ChainContext,
        vm: Arc<dyn TransitionStore>,
        db: Arc<dyn Database>,
    ) -> Self {
        let db = StateDb::new(db);
        Self {
            ctx,
            vm,
            statuses: Arc::new(StatusStore::new(db.clone())),
            db,
            codec: VertexCodec::new(config),
            max_epoch: config.max_epoch,
            vertices: WeakIndex::new("vertices"),
        }
    }

    /// Live handle for `id`, if one exists
    fn lookup(&self, id: &VertexId) -> Option<Vertex> {
        self.vertices.get(id).map(|inner| Vertex { inner })
    }

    /// Wrap decoded parts in a handle, reusing a live one with the same ID
    fn assemble(
        self: &Arc<Self>,
        bytes: Vec<u8>,
        epoch: u32,
        parents: Vec<VertexId>,
        entries: Vec<VertexEntry>,
    ) -> Result<Vertex> {
        let id = Id::from_data(&bytes);
        let inner = self.vertices.get_or_load(id, || {
            let status = match self.db.vertex_status(&id)? {
                Status::Unknown => Status::Processing,
                stored => stored,
            };
            Ok(VertexInner {
                id,
                epoch,
                parents,
                entries,
                bytes,
                status: RwLock::new(status),
                state: self.clone(),
            })
        })?;
        Ok(Vertex { inner })
    }
}

/// Builds, parses, and loads vertices
pub struct Serializer {
    config: SerializerConfig,
    state: OnceLock<Arc<SerializerState>>,
}

impl Serializer {
    pub fn new(config: SerializerConfig) -> Self {
        Self {
            config,
            state: OnceLock::new(),
        }
    }

    /// Create and initialize in one step
    pub fn with_collaborators(
        config: SerializerConfig,
        ctx: ChainContext,
        vm: Arc<dyn TransitionStore>,
        db: Arc<dyn Database>,
    ) -> Result<Self> {
        let serializer = Self::new(config);
        serializer.initialize(ctx, vm, db)?;
        Ok(serializer)
    }

    /// Bind the chain context, VM, and database.
    ///
    /// Only the first call takes effect; later calls are ignored.
    pub fn initialize(
        &self,
        ctx: ChainContext,
        vm: Arc<dyn TransitionStore>,
        db: Arc<dyn Database>,
    ) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| DagError::Config(format!("{:#}", e)))?;

        let (network_id, chain_id) = (ctx.network_id, ctx.chain_id);
        let mut fresh = false;
        self.state.get_or_init(|| {
            fresh = true;
            Arc::new(SerializerState::new(&self.config, ctx, vm, db))
        });

        if fresh {
            info!(network = network_id, chain = %chain_id, "Serializer initialized");
        } else {
            debug!(chain = %chain_id, "Serializer already initialized; ignoring");
        }
        Ok(())
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Chain context bound at initialization
    pub fn context(&self) -> Result<&ChainContext> {
        Ok(&self.state()?.ctx)
    }

    fn state(&self) -> Result<&Arc<SerializerState>> {
        self.state.get().ok_or(DagError::NotInitialized)
    }

    /// Assemble a new vertex.
    ///
    /// `transitions` are embedded in order, followed by `restricted_ids` as
    /// references. Parents are stored sorted and deduplicated. Nothing is
    /// persisted.
    pub fn build(
        &self,
        epoch: u32,
        parent_ids: &[VertexId],
        transitions: Vec<Arc<dyn Transition>>,
        restricted_ids: &[TransitionId],
    ) -> Result<Vertex> {
        let state = self.state()?;
        if epoch > state.max_epoch {
            return Err(DagError::InvalidEpoch {
                epoch,
                max: state.max_epoch,
            });
        }

        let mut parents = parent_ids.to_vec();
        parents.sort_unstable();
        parents.dedup();

        let total = transitions.len() + restricted_ids.len();
        let mut seen = HashSet::with_capacity(total);
        let mut entries = Vec::with_capacity(total);
        let mut encoded = Vec::with_capacity(total);

        for transition in transitions {
            let id = transition.id();
            if !seen.insert(id) {
                return Err(DagError::DuplicateTransition(id));
            }
            if transition.bytes().is_empty() {
                return Err(DagError::InvalidTransition {
                    id,
                    reason: "empty encoding".to_string(),
                });
            }
            transition.verify().map_err(|e| match e {
                e @ DagError::InvalidTransition { .. } => e,
                other => DagError::InvalidTransition {
                    id,
                    reason: other.to_string(),
                },
            })?;

            encoded.push(EncodedTransition::Embedded(transition.bytes().to_vec()));
            entries.push(VertexEntry::embedded(transition));
        }

        for id in restricted_ids {
            if !seen.insert(*id) {
                return Err(DagError::DuplicateTransition(*id));
            }
            let transition = state.vm.get(id).map_err(|e| {
                debug!(transition = %id, error = %e, "Referenced transition not resolvable");
                DagError::UnknownTransition(*id)
            })?;

            encoded.push(EncodedTransition::Referenced(*id));
            entries.push(VertexEntry::referenced(transition));
        }

        let unparsed = UnparsedVertex {
            version: CODEC_VERSION,
            epoch,
            parents,
            transitions: encoded,
        };
        let bytes = state.codec.encode(&unparsed)?;

        let vertex = state.assemble(bytes, epoch, unparsed.parents, entries)?;
        debug!(
            chain = %state.ctx.chain_id,
            vertex = %vertex.id(),
            epoch,
            transitions = total,
            "Built vertex"
        );
        Ok(vertex)
    }

    /// Decode a vertex from its wire encoding. Nothing is persisted.
    pub fn parse(&self, bytes: &[u8]) -> Result<Vertex> {
        let state = self.state()?;
        let unparsed = state.codec.decode(bytes)?;

        if let Some(existing) = state.lookup(&Id::from_data(bytes)) {
            return Ok(existing);
        }

        let mut seen = HashSet::with_capacity(unparsed.transitions.len());
        let mut entries = Vec::with_capacity(unparsed.transitions.len());
        for encoded in unparsed.transitions {
            let entry = match encoded {
                EncodedTransition::Embedded(tx_bytes) => {
                    let transition = state
                        .vm
                        .parse(&tx_bytes)
                        .map_err(|e| DagError::Decode(format!("Embedded transition: {}", e)))?;
                    VertexEntry::embedded(transition)
                }
                EncodedTransition::Referenced(id) => {
                    let transition = state.vm.get(&id).map_err(|e| {
                        debug!(transition = %id, error = %e, "Referenced transition not resolvable");
                        DagError::UnknownTransition(id)
                    })?;
                    VertexEntry::referenced(transition)
                }
            };

            if !seen.insert(entry.id()) {
                return Err(DagError::Decode(format!(
                    "Duplicate transition {} in vertex",
                    entry.id()
                )));
            }
            entries.push(entry);
        }

        let vertex = state.assemble(bytes.to_vec(), unparsed.epoch, unparsed.parents, entries)?;
        debug!(chain = %state.ctx.chain_id, vertex = %vertex.id(), "Parsed vertex");
        Ok(vertex)
    }

    /// Load a vertex by ID from the live handles or storage
    pub fn get(&self, id: &VertexId) -> Result<Vertex> {
        let state = self.state()?;
        if let Some(existing) = state.lookup(id) {
            return Ok(existing);
        }

        let bytes = state
            .db
            .vertex_bytes(id)?
            .ok_or(DagError::UnknownVertex(*id))?;
        self.parse(&bytes)
    }

    /// Store a vertex so `get` finds it later
    pub fn persist(&self, vertex: &Vertex) -> Result<()> {
        self.state()?;
        vertex.persist()?;
        debug!(vertex = %vertex.id(), status = %vertex.status(), "Persisted vertex");
        Ok(())
    }

    /// Current status of a transition
    pub fn transition_status(&self, id: &TransitionId) -> Result<Status> {
        self.state()?.statuses.status(id)
    }

    /// Accepted frontier
    pub fn edge(&self) -> Result<Vec<VertexId>> {
        self.state()?.db.edge()
    }

    /// Replace the accepted frontier
    pub fn set_edge(&self, ids: &[VertexId]) -> Result<()> {
        self.state()?.db.set_edge(ids)
    }
}
