//! Runs every query once and merges the matches into one sorted sequence.

use alloc::vec::Vec;
use hashbrown::HashSet;
use multifetch_core::{Entity, Result};
use multifetch_query::{CombinedOrder, MergedEntry, QuerySpec};
use multifetch_storage::StoreAdapter;

/// Builds the initial merged sequence for a set of queries.
pub struct ResultMerger<'a> {
    specs: &'a [QuerySpec],
    order: &'a CombinedOrder,
}

impl<'a> ResultMerger<'a> {
    pub fn new(specs: &'a [QuerySpec], order: &'a CombinedOrder) -> Self {
        Self { specs, order }
    }

    /// Executes every query against `store` and returns the merged sequence.
    ///
    /// An entity matched by several queries appears once, attributed to the
    /// lowest query index. The first store error aborts the fetch.
    pub fn fetch<S>(&self, store: &S) -> Result<Vec<MergedEntry>>
    where
        S: StoreAdapter + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (query, spec) in self.specs.iter().enumerate() {
            let matched = store.execute_query(spec)?;
            log::trace!("query {} on {} matched {} entities", query, spec.kind(), matched.len());
            for entity in matched {
                if seen.insert(entity.id().clone()) {
                    entries.push(MergedEntry::new(entity, query));
                }
            }
        }

        self.order.sort(&mut entries);
        Ok(entries)
    }

    /// Returns the lowest index of a query `entity` matches, if any.
    ///
    /// A predicate fault counts as no match for that query.
    pub fn membership(&self, entity: &Entity) -> Option<usize> {
        membership(self.specs, entity)
    }
}

pub(crate) fn membership(specs: &[QuerySpec], entity: &Entity) -> Option<usize> {
    for (query, spec) in specs.iter().enumerate() {
        match spec.matches(entity) {
            Ok(true) => return Some(query),
            Ok(false) => {}
            Err(err) => log::trace!("{} does not match query {}: {}", entity.id(), query, err),
        }
    }
    None
}
