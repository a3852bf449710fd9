//! Transition status management
//!
//! The [`StatusStore`] owns the decision state of every transition the
//! process has seen. Each transition has its own record lock and each input
//! its own conflict-set lock, so unrelated branches of the DAG never contend.
//!
//! Records and conflict sets stay in memory only while a [`Governance`]
//! holds them. Decisions are persisted before they are applied, so a record
//! reloaded from storage is never behind the copy it replaces.
//!
//! Lock order: a transition record first, then its conflict sets in input-ID
//! order. Dependency statuses are read before any lock is taken; `Accepted`
//! is terminal, so an observation of it cannot go stale.

use crate::conflicts::{ConflictIndex, SharedConflictSet};
use crate::error::{DagError, Result, VerificationError};
use crate::storage::StateDb;
use crate::transition::Transition;
use crate::weak_index::WeakIndex;
use parking_lot::RwLock;
use snowdag_core::{Id, Status, TransitionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutable decision state of one transition
#[derive(Debug)]
pub struct TransitionRecord {
    status: Status,
}

impl TransitionRecord {
    pub fn status(&self) -> Status {
        self.status
    }
}

pub type SharedRecord = Arc<RwLock<TransitionRecord>>;

/// Everything a vote unit needs to check and decide one transition
#[derive(Clone)]
pub struct Governance {
    pub(crate) id: TransitionId,
    pub(crate) inputs: Vec<Id>,
    pub(crate) record: SharedRecord,
    pub(crate) conflicts: Vec<(Id, SharedConflictSet)>,
    pub(crate) dependencies: Vec<(TransitionId, SharedRecord)>,
}

impl Governance {
    pub fn status(&self) -> Status {
        self.record.read().status
    }
}

/// Loaded state for a transition that has not yet joined consensus.
///
/// Building one has no visible effect; [`Registration::commit`] applies it.
pub struct Registration {
    governance: Governance,
}

impl Registration {
    /// Mark the transition processing if unseen and join its conflict sets
    pub fn commit(self) -> Governance {
        let gov = self.governance;
        {
            let mut record = gov.record.write();
            if record.status == Status::Unknown {
                record.status = Status::Processing;
            }
        }
        for (_, set) in &gov.conflicts {
            set.lock().insert(gov.id);
        }
        gov
    }
}

/// Owned, injectable store of transition statuses and conflict sets
pub struct StatusStore {
    records: WeakIndex<TransitionId, RwLock<TransitionRecord>>,
    conflicts: ConflictIndex,
    db: StateDb,
}

impl StatusStore {
    pub fn new(db: StateDb) -> Self {
        Self {
            records: WeakIndex::new("transition_records"),
            conflicts: ConflictIndex::new(db.clone()),
            db,
        }
    }

    /// Record for `id`, loaded from storage when not live
    pub fn record(&self, id: &TransitionId) -> Result<SharedRecord> {
        self.records.get_or_load(*id, || {
            let status = self.db.transition_status(id)?;
            Ok(RwLock::new(TransitionRecord { status }))
        })
    }

    /// Current status of `id`
    pub fn status(&self, id: &TransitionId) -> Result<Status> {
        match self.records.get(id) {
            Some(record) => Ok(record.read().status),
            None => self.db.transition_status(id),
        }
    }

    /// Load everything needed to bring `transition` under consensus
    pub fn prepare(&self, transition: &dyn Transition) -> Result<Registration> {
        let id = transition.id();
        let record = self.record(&id)?;

        let inputs = transition.input_ids();
        let conflicts = self.conflicts.load(&inputs)?;

        let dependencies = transition
            .dependencies()
            .into_iter()
            .map(|dep| Ok((dep, self.record(&dep)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Registration {
            governance: Governance {
                id,
                inputs,
                record,
                conflicts,
                dependencies,
            },
        })
    }

    /// Bring `transition` under consensus: mark it processing if unseen,
    /// join its conflict sets, and resolve its dependency records.
    pub fn register(&self, transition: &dyn Transition) -> Result<Governance> {
        Ok(self.prepare(transition)?.commit())
    }

    /// Side-effect free check that the transition may still be voted on
    pub fn verify(&self, gov: &Governance) -> Result<()> {
        let status = gov.record.read().status;
        if status.is_decided() {
            return Err(VerificationError::AlreadyDecided { id: gov.id, status }.into());
        }

        for (_, set) in &gov.conflicts {
            let set = set.lock();
            if let Some(accepted) = set.accepted() {
                if set.is_restricted(&gov.id) {
                    return Err(VerificationError::Restricted { id: gov.id, accepted }.into());
                }
            }
        }

        check_dependencies(gov)
    }

    /// Decide `gov` accepted. This is the single place a transition is
    /// accepted; a second attempt is a caller bug.
    pub fn accept(&self, gov: &Governance) -> Result<()> {
        check_dependencies(gov)?;

        let mut record = gov.record.write();
        if record.status.is_decided() {
            warn!(transition = %gov.id, status = %record.status, "Accept called on decided transition");
            return Err(DagError::precondition(format!(
                "transition {} is already {}",
                gov.id, record.status
            )));
        }

        let mut sets: Vec<_> = gov.conflicts.iter().map(|(_, set)| set.lock()).collect();
        for set in &sets {
            if let Some(accepted) = set.accepted() {
                if set.is_restricted(&gov.id) {
                    return Err(VerificationError::Restricted { id: gov.id, accepted }.into());
                }
            }
        }

        self.db.accept_transition(&gov.id, &gov.inputs)?;

        record.status = Status::Accepted;
        let mut restricted = 0;
        for set in sets.iter_mut() {
            set.mark_accepted(gov.id);
            restricted += set.len().saturating_sub(1);
        }

        info!(transition = %gov.id, restricted, "Transition accepted");
        Ok(())
    }

    /// Decide `gov` rejected. Conflict sets are untouched.
    pub fn reject(&self, gov: &Governance) -> Result<()> {
        let mut record = gov.record.write();
        if record.status.is_decided() {
            warn!(transition = %gov.id, status = %record.status, "Reject called on decided transition");
            return Err(DagError::precondition(format!(
                "transition {} is already {}",
                gov.id, record.status
            )));
        }

        self.db.reject_transition(&gov.id)?;
        record.status = Status::Rejected;

        debug!(transition = %gov.id, "Transition rejected");
        Ok(())
    }

    /// Number of indexed records, including dropped ones not yet swept
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of indexed conflict sets, including dropped ones not yet swept
    pub fn conflict_sets(&self) -> usize {
        self.conflicts.len()
    }
}

fn check_dependencies(gov: &Governance) -> Result<()> {
    for (dependency, record) in &gov.dependencies {
        let status = record.read().status;
        if !status.is_accepted() {
            return Err(VerificationError::UnmetDependency {
                id: gov.id,
                dependency: *dependency,
                status,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDatabase;
    use crate::testing::TestTransition;

    fn store() -> StatusStore {
        StatusStore::new(StateDb::new(Arc::new(MemoryDatabase::new())))
    }

    #[test]
    fn test_register_marks_processing() {
        let store = store();
        let tr = TestTransition::new(b"t1");
        assert_eq!(store.status(&tr.id()).unwrap(), Status::Unknown);

        let gov = store.register(&tr).unwrap();
        assert_eq!(gov.status(), Status::Processing);
        assert_eq!(store.status(&tr.id()).unwrap(), Status::Processing);
    }

    #[test]
    fn test_accept_once() {
        let store = store();
        let tr = TestTransition::new(b"t1");
        let gov = store.register(&tr).unwrap();

        store.verify(&gov).unwrap();
        store.accept(&gov).unwrap();

        let err = store.verify(&gov).unwrap_err();
        assert!(err.is_verification_failure());
        let err = store.accept(&gov).unwrap_err();
        assert!(err.is_precondition_violation());
    }

    #[test]
    fn test_accept_restricts_conflicting_member() {
        let store = store();
        let input = Id::from_data(b"utxo");
        let a = TestTransition::new(b"a").with_inputs(vec![input]);
        let b = TestTransition::new(b"b").with_inputs(vec![input]);

        let gov_a = store.register(&a).unwrap();
        let gov_b = store.register(&b).unwrap();
        store.verify(&gov_b).unwrap();

        store.accept(&gov_a).unwrap();

        let err = store.verify(&gov_b).unwrap_err();
        assert!(matches!(
            err,
            DagError::Verification(VerificationError::Restricted { accepted, .. }) if accepted == a.id()
        ));
        assert!(store.accept(&gov_b).unwrap_err().is_verification_failure());
        assert_eq!(gov_b.status(), Status::Processing);
    }

    #[test]
    fn test_reject_does_not_restrict() {
        let store = store();
        let input = Id::from_data(b"utxo");
        let a = TestTransition::new(b"a").with_inputs(vec![input]);
        let b = TestTransition::new(b"b").with_inputs(vec![input]);

        let gov_a = store.register(&a).unwrap();
        let gov_b = store.register(&b).unwrap();

        store.reject(&gov_a).unwrap();
        store.verify(&gov_b).unwrap();
        store.accept(&gov_b).unwrap();
    }

    #[test]
    fn test_dependency_must_be_accepted() {
        let store = store();
        let parent = TestTransition::new(b"parent");
        let child = TestTransition::new(b"child").with_dependencies(vec![parent.id()]);

        let gov_parent = store.register(&parent).unwrap();
        let gov_child = store.register(&child).unwrap();

        let err = store.verify(&gov_child).unwrap_err();
        assert!(matches!(
            err,
            DagError::Verification(VerificationError::UnmetDependency { status: Status::Processing, .. })
        ));

        store.accept(&gov_parent).unwrap();
        store.verify(&gov_child).unwrap();
        store.accept(&gov_child).unwrap();
    }

    #[test]
    fn test_accept_revalidates_rejected_dependency() {
        let store = store();
        let parent = TestTransition::new(b"parent");
        let child = TestTransition::new(b"child").with_dependencies(vec![parent.id()]);

        let gov_parent = store.register(&parent).unwrap();
        let gov_child = store.register(&child).unwrap();

        store.reject(&gov_parent).unwrap();
        let err = store.accept(&gov_child).unwrap_err();
        assert!(err.is_verification_failure());
        assert_eq!(gov_child.status(), Status::Processing);
    }

    #[test]
    fn test_status_survives_new_store() {
        let db = StateDb::new(Arc::new(MemoryDatabase::new()));
        let input = Id::from_data(b"utxo");
        let a = TestTransition::new(b"a").with_inputs(vec![input]);
        let b = TestTransition::new(b"b").with_inputs(vec![input]);

        {
            let store = StatusStore::new(db.clone());
            let gov = store.register(&a).unwrap();
            store.accept(&gov).unwrap();
        }

        let store = StatusStore::new(db);
        assert_eq!(store.status(&a.id()).unwrap(), Status::Accepted);
        let gov_b = store.register(&b).unwrap();
        assert!(store.verify(&gov_b).unwrap_err().is_verification_failure());
    }

    #[test]
    fn test_failed_persistence_leaves_state_untouched() {
        let mem = Arc::new(MemoryDatabase::new());
        let store = StatusStore::new(StateDb::new(mem.clone()));
        let tr = TestTransition::new(b"t1").with_inputs(vec![Id::from_data(b"utxo")]);
        let gov = store.register(&tr).unwrap();

        mem.close();
        assert!(matches!(store.accept(&gov), Err(DagError::Storage(_))));
        assert_eq!(gov.status(), Status::Processing);
        assert!(gov.conflicts[0].1.lock().accepted().is_none());
    }

    #[test]
    fn test_prepare_has_no_visible_effect() {
        let store = store();
        let input = Id::from_data(b"utxo");
        let tr = TestTransition::new(b"t1").with_inputs(vec![input]);

        let registration = store.prepare(&tr).unwrap();
        assert_eq!(store.status(&tr.id()).unwrap(), Status::Unknown);
        assert!(registration.governance.conflicts[0].1.lock().is_empty());
        drop(registration);
        assert_eq!(store.status(&tr.id()).unwrap(), Status::Unknown);

        let gov = store.prepare(&tr).unwrap().commit();
        assert_eq!(gov.status(), Status::Processing);
        assert!(gov.conflicts[0].1.lock().contains(&tr.id()));
    }

    #[test]
    fn test_released_records_are_swept() {
        let store = store();
        let mut last = None;
        for n in 0..5000u64 {
            let input = Id::EMPTY.prefix(n);
            let tr = TestTransition::with_id(input.prefix(0), &n.to_be_bytes()).with_inputs(vec![input]);
            let gov = store.register(&tr).unwrap();
            store.accept(&gov).unwrap();
            last = Some((tr, input));
        }

        assert!(store.len() < 5000);
        assert!(store.conflict_sets() < 5000);

        // Decisions reload from storage once the records are gone
        let (tr, input) = last.unwrap();
        assert_eq!(store.status(&tr.id()).unwrap(), Status::Accepted);
        let rival = TestTransition::new(b"rival").with_inputs(vec![input]);
        let gov = store.register(&rival).unwrap();
        assert!(matches!(
            store.verify(&gov),
            Err(DagError::Verification(VerificationError::Restricted { accepted, .. })) if accepted == tr.id()
        ));
    }

    #[test]
    fn test_live_records_are_shared() {
        let store = store();
        let tr = TestTransition::new(b"t1");
        let gov = store.register(&tr).unwrap();
        let again = store.record(&tr.id()).unwrap();
        assert!(Arc::ptr_eq(&gov.record, &again));

        store.accept(&gov).unwrap();
        assert_eq!(again.read().status(), Status::Accepted);
    }
}
