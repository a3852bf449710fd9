//! Conflict sets
//!
//! Transitions consuming the same input are mutually exclusive. Each input
//! owns one [`ConflictSet`]; accepting a member restricts every other member,
//! including ones that join after the fact.

use crate::error::Result;
use crate::storage::StateDb;
use crate::weak_index::WeakIndex;
use parking_lot::Mutex;
use snowdag_core::{Id, TransitionId};
use std::collections::HashSet;
use std::sync::Arc;

/// Mutually exclusive transitions competing for one input
#[derive(Debug, Default)]
pub struct ConflictSet {
    members: HashSet<TransitionId>,
    accepted: Option<TransitionId>,
}

impl ConflictSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whose input was already consumed by `owner`
    pub fn with_accepted(owner: TransitionId) -> Self {
        let mut set = Self::default();
        set.members.insert(owner);
        set.accepted = Some(owner);
        set
    }

    /// Add a member; returns false if it was already present
    pub fn insert(&mut self, id: TransitionId) -> bool {
        self.members.insert(id)
    }

    pub fn contains(&self, id: &TransitionId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The accepted member, if any
    pub fn accepted(&self) -> Option<TransitionId> {
        self.accepted
    }

    /// Whether `id` lost this set to a different, accepted member
    pub fn is_restricted(&self, id: &TransitionId) -> bool {
        matches!(self.accepted, Some(accepted) if accepted != *id)
    }

    /// Record `id` as the winner. Callers hold the member's record lock and
    /// have checked [`ConflictSet::is_restricted`].
    pub(crate) fn mark_accepted(&mut self, id: TransitionId) {
        debug_assert!(!self.is_restricted(&id));
        self.members.insert(id);
        self.accepted = Some(id);
    }
}

pub type SharedConflictSet = Arc<Mutex<ConflictSet>>;

/// Conflict sets keyed by input ID.
///
/// A set stays in memory while a registered transition holds it; afterwards
/// it is rebuilt from the persisted owner of its input.
pub struct ConflictIndex {
    sets: WeakIndex<Id, Mutex<ConflictSet>>,
    db: StateDb,
}

impl ConflictIndex {
    pub fn new(db: StateDb) -> Self {
        Self {
            sets: WeakIndex::new("conflict_sets"),
            db,
        }
    }

    /// Set for `input`, seeded from the persisted owner when not live
    pub fn get_or_load(&self, input: &Id) -> Result<SharedConflictSet> {
        self.sets.get_or_load(*input, || {
            let set = match self.db.conflict_owner(input)? {
                Some(owner) => ConflictSet::with_accepted(owner),
                None => ConflictSet::new(),
            };
            Ok(Mutex::new(set))
        })
    }

    /// Sets for `inputs`, deduplicated and sorted by input ID so callers that
    /// lock several sets always take them in the same order. Membership is
    /// left to the caller.
    pub fn load(&self, inputs: &[Id]) -> Result<Vec<(Id, SharedConflictSet)>> {
        let mut inputs = inputs.to_vec();
        inputs.sort_unstable();
        inputs.dedup();

        inputs
            .into_iter()
            .map(|input| Ok((input, self.get_or_load(&input)?)))
            .collect()
    }

    /// Live set for `input`
    pub fn get(&self, input: &Id) -> Option<SharedConflictSet> {
        self.sets.get(input)
    }

    /// Number of indexed sets, including dropped ones not yet swept
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDatabase;

    fn tid(n: u64) -> TransitionId {
        Id::EMPTY.prefix(n)
    }

    #[test]
    fn test_accept_restricts_others() {
        let mut set = ConflictSet::new();
        set.insert(tid(1));
        set.insert(tid(2));
        assert_eq!(set.len(), 2);
        assert!(!set.is_restricted(&tid(1)));

        set.mark_accepted(tid(1));
        assert_eq!(set.accepted(), Some(tid(1)));
        assert!(!set.is_restricted(&tid(1)));
        assert!(set.is_restricted(&tid(2)));
    }

    #[test]
    fn test_future_members_are_restricted() {
        let mut set = ConflictSet::new();
        set.insert(tid(1));
        set.mark_accepted(tid(1));

        assert!(set.insert(tid(3)));
        assert!(set.is_restricted(&tid(3)));
        assert!(!set.insert(tid(3)));
    }

    #[test]
    fn test_load_sorts_and_dedups_inputs() {
        let index = ConflictIndex::new(StateDb::new(Arc::new(MemoryDatabase::new())));
        let (a, b) = (Id::from_data(b"a"), Id::from_data(b"b"));

        let sets = index.load(&[b, a, b]).unwrap();
        let inputs: Vec<_> = sets.iter().map(|(input, _)| *input).collect();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(inputs, expected);
        assert_eq!(index.len(), 2);

        sets[0].1.lock().insert(tid(1));
        let again = index.load(&[expected[0]]).unwrap();
        assert!(Arc::ptr_eq(&again[0].1, &sets[0].1));
        assert!(again[0].1.lock().contains(&tid(1)));
    }

    #[test]
    fn test_sets_are_seeded_from_storage() {
        let db = StateDb::new(Arc::new(MemoryDatabase::new()));
        let input = Id::from_data(b"utxo");
        db.accept_transition(&tid(1), &[input]).unwrap();

        let index = ConflictIndex::new(db);
        let set = index.get_or_load(&input).unwrap();
        let set = set.lock();
        assert_eq!(set.accepted(), Some(tid(1)));
        assert!(set.is_restricted(&tid(2)));
    }

    #[test]
    fn test_dropped_sets_are_released() {
        let db = StateDb::new(Arc::new(MemoryDatabase::new()));
        let index = ConflictIndex::new(db.clone());
        let owner = tid(1);
        let input = Id::from_data(b"utxo-0");
        db.accept_transition(&owner, &[input]).unwrap();

        for n in 0..5000u64 {
            let sets = index.load(&[Id::EMPTY.prefix(n)]).unwrap();
            sets[0].1.lock().insert(tid(n));
        }
        assert!(index.len() < 5000);

        // Nothing live for the consumed input; the owner comes back from storage
        assert!(index.get(&input).is_none());
        let set = index.get_or_load(&input).unwrap();
        assert_eq!(set.lock().accepted(), Some(owner));
    }
}
