//! Test doubles for the VM boundary

use crate::error::{DagError, Result};
use crate::transition::{Transition, TransitionStore};
use parking_lot::RwLock;
use snowdag_core::{Id, TransitionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Transition with caller-controlled identity, dependencies, and inputs
#[derive(Debug, Clone)]
pub struct TestTransition {
    id: TransitionId,
    bytes: Vec<u8>,
    dependencies: Vec<TransitionId>,
    inputs: Vec<Id>,
    verify_error: Option<String>,
}

impl TestTransition {
    /// Transition whose ID is the hash of `bytes`
    pub fn new(bytes: &[u8]) -> Self {
        Self::with_id(Id::from_data(bytes), bytes)
    }

    /// Transition with an explicit ID
    pub fn with_id(id: TransitionId, bytes: &[u8]) -> Self {
        Self {
            id,
            bytes: bytes.to_vec(),
            dependencies: Vec::new(),
            inputs: Vec::new(),
            verify_error: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<TransitionId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<Id>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Make structural verification fail with `reason`
    pub fn with_verify_error(mut self, reason: &str) -> Self {
        self.verify_error = Some(reason.to_string());
        self
    }
}

impl Transition for TestTransition {
    fn id(&self) -> TransitionId {
        self.id
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn dependencies(&self) -> Vec<TransitionId> {
        self.dependencies.clone()
    }

    fn input_ids(&self) -> Vec<Id> {
        self.inputs.clone()
    }

    fn verify(&self) -> Result<()> {
        match &self.verify_error {
            Some(reason) => Err(DagError::InvalidTransition {
                id: self.id,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// In-memory [`TransitionStore`] over registered transitions
#[derive(Debug, Default)]
pub struct TestVm {
    by_id: RwLock<HashMap<TransitionId, Arc<dyn Transition>>>,
    by_bytes: RwLock<HashMap<Vec<u8>, Arc<dyn Transition>>>,
    parses: AtomicUsize,
    gets: AtomicUsize,
}

impl TestVm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `transition` resolvable by ID and parsable from its bytes
    pub fn register(&self, transition: Arc<dyn Transition>) {
        self.by_bytes
            .write()
            .insert(transition.bytes().to_vec(), transition.clone());
        self.by_id.write().insert(transition.id(), transition);
    }

    /// Make `transition` parsable but not resolvable by ID
    pub fn register_parse_only(&self, transition: Arc<dyn Transition>) {
        self.by_bytes
            .write()
            .insert(transition.bytes().to_vec(), transition);
    }

    pub fn parse_calls(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }
}

impl TransitionStore for TestVm {
    fn parse(&self, bytes: &[u8]) -> Result<Arc<dyn Transition>> {
        self.parses.fetch_add(1, Ordering::Relaxed);
        self.by_bytes
            .read()
            .get(bytes)
            .cloned()
            .ok_or_else(|| DagError::Decode(format!("Unknown transition bytes ({} bytes)", bytes.len())))
    }

    fn get(&self, id: &TransitionId) -> Result<Arc<dyn Transition>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.by_id
            .read()
            .get(id)
            .cloned()
            .ok_or(DagError::UnknownTransition(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_resolves_registered() {
        let vm = TestVm::new();
        let tr = Arc::new(TestTransition::new(b"t"));
        vm.register(tr.clone());

        assert_eq!(vm.get(&tr.id()).unwrap().id(), tr.id());
        assert_eq!(vm.parse(b"t").unwrap().id(), tr.id());
        assert_eq!(vm.get_calls(), 1);
        assert_eq!(vm.parse_calls(), 1);
    }

    #[test]
    fn test_vm_unknown() {
        let vm = TestVm::new();
        let id = Id::from_data(b"missing");
        assert!(matches!(vm.get(&id), Err(DagError::UnknownTransition(missing)) if missing == id));
        assert!(vm.parse(b"missing").is_err());
    }

    #[test]
    fn test_parse_only() {
        let vm = TestVm::new();
        let tr = Arc::new(TestTransition::new(b"fresh"));
        vm.register_parse_only(tr.clone());
        assert!(vm.parse(b"fresh").is_ok());
        assert!(vm.get(&tr.id()).is_err());
    }
}
