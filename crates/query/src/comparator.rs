//! Combined sort order over the results of several queries.
//!
//! The combined order concatenates the global sort keys and every query's
//! sort keys, then breaks remaining ties by query index and finally by
//! store-native order (`EntityId`). Two distinct entities never compare
//! equal, so the order is total and insertion by binary search is
//! deterministic.

use crate::ast::SortKey;
use crate::spec::QuerySpec;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::HashSet;
use multifetch_core::{Entity, EntityId, Error, Result};

/// An entity placed in the merged sequence.
#[derive(Clone, Debug)]
pub struct MergedEntry {
    /// Snapshot of the entity
    pub entity: Rc<Entity>,
    /// Lowest index of a query the entity matches
    pub query: usize,
}

impl MergedEntry {
    pub fn new(entity: Rc<Entity>, query: usize) -> Self {
        Self { entity, query }
    }

    #[inline]
    pub fn id(&self) -> &EntityId {
        self.entity.id()
    }
}

/// Total order used to merge and maintain the results of several queries.
#[derive(Clone, Debug)]
pub struct CombinedOrder {
    keys: Vec<SortKey>,
}

impl CombinedOrder {
    /// Builds the combined order from global keys followed by each query's keys.
    ///
    /// A field that appears more than once keeps its first direction.
    /// Fails with `InvalidSortDescriptors` when no key is given anywhere.
    pub fn new(specs: &[QuerySpec], global: &[SortKey]) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut keys = Vec::new();

        let declared = global
            .iter()
            .chain(specs.iter().flat_map(|spec| spec.sort_keys().iter()));
        for key in declared {
            if seen.insert(key.field()) {
                keys.push(key.clone());
            }
        }

        if keys.is_empty() {
            return Err(Error::InvalidSortDescriptors);
        }
        Ok(Self { keys })
    }

    /// Returns the effective sort keys.
    #[inline]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compares two merged entries.
    pub fn compare(&self, a: &MergedEntry, b: &MergedEntry) -> Ordering {
        for key in &self.keys {
            let cmp = key.compare(&a.entity, &b.entity);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        a.query.cmp(&b.query).then_with(|| a.id().cmp(b.id()))
    }

    /// Returns the offset at which `entry` belongs in the sorted `entries`.
    pub fn insertion_point(&self, entries: &[MergedEntry], entry: &MergedEntry) -> usize {
        entries.partition_point(|existing| self.compare(existing, entry) == Ordering::Less)
    }

    /// Sorts `entries` in place.
    pub fn sort(&self, entries: &mut [MergedEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }

    /// Returns true if `entries` are strictly ascending under this order.
    pub fn is_sorted(&self, entries: &[MergedEntry]) -> bool {
        entries
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1]) == Ordering::Less)
    }
}
