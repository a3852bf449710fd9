//! Vote units
//!
//! A [`Tx`] wraps one transition for the voting engine. Many Tx values may
//! wrap the same transition across vertices; they all share one status record,
//! so once any of them decides the transition the rest fail verification.

use crate::error::{DagError, Result};
use crate::state::{Governance, StatusStore};
use crate::transition::Transition;
use snowdag_core::{Status, TransitionId};
use std::fmt;
use std::sync::{Arc, OnceLock};

pub struct Tx {
    transition: Arc<dyn Transition>,
    dependencies: Vec<Arc<dyn Transition>>,
    governance: Governance,
    store: Arc<StatusStore>,
    structural: OnceLock<std::result::Result<(), String>>,
}

impl Tx {
    pub(crate) fn new(
        transition: Arc<dyn Transition>,
        dependencies: Vec<Arc<dyn Transition>>,
        governance: Governance,
        store: Arc<StatusStore>,
    ) -> Self {
        Self {
            transition,
            dependencies,
            governance,
            store,
            structural: OnceLock::new(),
        }
    }

    pub fn id(&self) -> TransitionId {
        self.governance.id
    }

    pub fn transition(&self) -> &Arc<dyn Transition> {
        &self.transition
    }

    /// Resolved dependency transitions
    pub fn dependencies(&self) -> &[Arc<dyn Transition>] {
        &self.dependencies
    }

    pub fn bytes(&self) -> &[u8] {
        self.transition.bytes()
    }

    /// Check the transition may be voted on.
    ///
    /// Re-reads the shared status on every call: a transition decided through
    /// another Tx or vertex must fail here even if it looked fresh when this
    /// Tx was built.
    pub fn verify(&self) -> Result<()> {
        self.verify_structure()?;
        self.store.verify(&self.governance)
    }

    /// Decide the transition accepted and restrict its conflicting siblings
    pub fn accept(&self) -> Result<()> {
        self.verify_structure()?;
        self.store.accept(&self.governance)
    }

    /// Decide the transition rejected
    pub fn reject(&self) -> Result<()> {
        self.store.reject(&self.governance)
    }

    pub fn status(&self) -> Status {
        self.governance.status()
    }

    fn verify_structure(&self) -> Result<()> {
        let structural = self
            .structural
            .get_or_init(|| {
                self.transition.verify().map_err(|e| match e {
                    DagError::InvalidTransition { reason, .. } => reason,
                    other => other.to_string(),
                })
            });
        structural.clone().map_err(|reason| DagError::InvalidTransition {
            id: self.id(),
            reason,
        })
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("id", &self.id())
            .field("status", &self.status())
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryDatabase, StateDb};
    use crate::testing::TestTransition;

    fn store() -> Arc<StatusStore> {
        Arc::new(StatusStore::new(StateDb::new(Arc::new(MemoryDatabase::new()))))
    }

    fn wrap(transition: Arc<dyn Transition>, store: &Arc<StatusStore>) -> Tx {
        let governance = store.register(transition.as_ref()).unwrap();
        Tx::new(transition, vec![], governance, store.clone())
    }

    #[test]
    fn test_tx_lifecycle() {
        let store = store();
        let tx = wrap(Arc::new(TestTransition::new(b"t")), &store);
        assert_eq!(tx.status(), Status::Processing);

        tx.verify().unwrap();
        tx.verify().unwrap();
        tx.accept().unwrap();
        assert_eq!(tx.status(), Status::Accepted);
        assert!(tx.verify().unwrap_err().is_verification_failure());
    }

    #[test]
    fn test_txs_share_status() {
        let store = store();
        let tr: Arc<dyn Transition> = Arc::new(TestTransition::new(b"t"));
        let first = wrap(tr.clone(), &store);
        let second = wrap(tr, &store);

        first.accept().unwrap();
        assert_eq!(second.status(), Status::Accepted);
        assert!(second.verify().is_err());
        assert!(second.accept().unwrap_err().is_precondition_violation());
    }

    #[test]
    fn test_structural_failure() {
        let store = store();
        let tr = TestTransition::new(b"bad").with_verify_error("malformed output");
        let tx = wrap(Arc::new(tr), &store);

        let err = tx.verify().unwrap_err();
        assert!(matches!(err, DagError::InvalidTransition { ref reason, .. } if reason == "malformed output"));
        assert_eq!(tx.status(), Status::Processing);
    }

    #[test]
    fn test_reject() {
        let store = store();
        let tx = wrap(Arc::new(TestTransition::new(b"t")), &store);
        tx.reject().unwrap();
        assert_eq!(tx.status(), Status::Rejected);
        assert!(tx.reject().unwrap_err().is_precondition_violation());
    }
}
