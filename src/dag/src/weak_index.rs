//! Index of live shared values
//!
//! Entries hold `Weak` references, so a value lives exactly as long as some
//! caller holds it. Dead entries are swept once the index doubles past the
//! live count of the previous sweep.
//!
//! Missing values are loaded while the entry's shard is locked. A value that
//! was dropped has already persisted whatever it decided, so a reload can
//! never observe older state than the last live copy.

use crate::error::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Index size that triggers the first sweep
pub(crate) const MIN_PRUNE_THRESHOLD: usize = 1024;

pub(crate) struct WeakIndex<K, V> {
    entries: DashMap<K, Weak<V>>,
    prune_threshold: AtomicUsize,
    name: &'static str,
}

impl<K: Eq + Hash + Copy, V> WeakIndex<K, V> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            entries: DashMap::new(),
            prune_threshold: AtomicUsize::new(MIN_PRUNE_THRESHOLD),
            name,
        }
    }

    /// Live value for `key`, if any
    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
        let weak = self.entries.get(key)?.clone();
        weak.upgrade()
    }

    /// Live value for `key`, or the one `load` produces
    pub(crate) fn get_or_load<F>(&self, key: K, load: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let value = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
                Some(live) => return Ok(live),
                None => {
                    let value = Arc::new(load()?);
                    occupied.insert(Arc::downgrade(&value));
                    value
                }
            },
            Entry::Vacant(vacant) => {
                let value = Arc::new(load()?);
                vacant.insert(Arc::downgrade(&value));
                value
            }
        };

        self.maybe_prune();
        Ok(value)
    }

    /// Number of entries, dead ones included until the next sweep
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn maybe_prune(&self) {
        let threshold = self.prune_threshold.load(Ordering::Relaxed);
        if self.entries.len() < threshold {
            return;
        }

        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let live = self.entries.len();
        self.prune_threshold
            .store((live * 2).max(MIN_PRUNE_THRESHOLD), Ordering::Relaxed);
        debug!(index = self.name, live, "Pruned dead entries");
    }
}
