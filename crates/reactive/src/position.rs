//! Identity to row lookup for the merged sequence.

use hashbrown::HashMap;
use multifetch_core::EntityId;
use multifetch_query::MergedEntry;

/// Maps each entity in the merged sequence to its current row.
///
/// Kept in step with the sequence after every fetch and diff so that
/// lookups by identity never scan.
#[derive(Clone, Debug, Default)]
pub struct PositionIndex {
    rows: HashMap<EntityId, usize>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index for `entries`.
    pub fn build(entries: &[MergedEntry]) -> Self {
        let mut index = Self::new();
        index.rebuild(entries);
        index
    }

    /// Discards everything and indexes `entries` from scratch.
    pub fn rebuild(&mut self, entries: &[MergedEntry]) {
        self.rows.clear();
        self.rows.reserve(entries.len());
        for (row, entry) in entries.iter().enumerate() {
            self.rows.insert(entry.id().clone(), row);
        }
    }

    /// Re-records rows `start..` after the sequence shifted from `start` on.
    pub fn reindex_from(&mut self, entries: &[MergedEntry], start: usize) {
        for (row, entry) in entries.iter().enumerate().skip(start) {
            self.rows.insert(entry.id().clone(), row);
        }
    }

    /// Forgets an entity, returning the row it was recorded at.
    pub fn remove(&mut self, id: &EntityId) -> Option<usize> {
        self.rows.remove(id)
    }

    #[inline]
    pub fn get(&self, id: &EntityId) -> Option<usize> {
        self.rows.get(id).copied()
    }

    #[inline]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.rows.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if the index records exactly the rows of `entries`.
    pub fn is_consistent_with(&self, entries: &[MergedEntry]) -> bool {
        self.rows.len() == entries.len()
            && entries
                .iter()
                .enumerate()
                .all(|(row, entry)| self.get(entry.id()) == Some(row))
    }
}
