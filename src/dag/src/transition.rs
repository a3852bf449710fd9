//! Capability interfaces consumed from the VM.
//!
//! The vertex layer never interprets transition bytes. It only needs a
//! transition's identity, encoding, the transitions it depends on, and the
//! inputs it consumes (two transitions sharing an input conflict).

use crate::error::Result;
use snowdag_core::{Id, TransitionId};
use std::fmt;
use std::sync::Arc;

/// A content-addressed state-change proposal defined by the VM
pub trait Transition: Send + Sync + fmt::Debug {
    /// Identifier, a deterministic function of [`Transition::bytes`]
    fn id(&self) -> TransitionId;

    /// Canonical byte encoding
    fn bytes(&self) -> &[u8];

    /// Transitions that must be accepted before this one may be
    fn dependencies(&self) -> Vec<TransitionId>;

    /// Resources consumed; transitions sharing an input are mutually exclusive
    fn input_ids(&self) -> Vec<Id>;

    /// Structural validation, independent of consensus state
    fn verify(&self) -> Result<()>;
}

/// Resolves transitions, normally backed by the VM
pub trait TransitionStore: Send + Sync {
    /// Parse raw bytes into a transition
    fn parse(&self, bytes: &[u8]) -> Result<Arc<dyn Transition>>;

    /// Look up a known transition, failing with
    /// [`DagError::UnknownTransition`](crate::DagError::UnknownTransition) when absent
    fn get(&self, id: &TransitionId) -> Result<Arc<dyn Transition>>;
}
