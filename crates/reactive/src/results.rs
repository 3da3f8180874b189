//! The merged, sorted result sequence.

use crate::change_set::Position;
use crate::position::PositionIndex;
use alloc::rc::Rc;
use alloc::vec::Vec;
use multifetch_core::{Entity, EntityId};
use multifetch_query::MergedEntry;

/// Fetched results of a controller.
///
/// Holds the merged sequence of every query's matches under the combined
/// order, plus an index from identity to row. After the initial fetch the
/// sequence is only ever patched by the diff engine.
#[derive(Clone, Debug, Default)]
pub struct FetchedResults {
    entries: Vec<MergedEntry>,
    index: PositionIndex,
}

impl FetchedResults {
    /// Wraps an already sorted sequence.
    pub fn from_entries(entries: Vec<MergedEntry>) -> Self {
        let index = PositionIndex::build(&entries);
        Self { entries, index }
    }

    /// Returns the number of entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the merged sequence with the query index of each entry.
    #[inline]
    pub fn entries(&self) -> &[MergedEntry] {
        &self.entries
    }

    /// Iterates the entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Entity>> + '_ {
        self.entries.iter().map(|entry| &entry.entity)
    }

    /// Returns the entities in order.
    pub fn entities(&self) -> Vec<Rc<Entity>> {
        self.iter().cloned().collect()
    }

    /// Returns the row of `id`, if present.
    #[inline]
    pub fn row_of(&self, id: &EntityId) -> Option<usize> {
        self.index.get(id)
    }

    /// Returns the position of `id`, if present.
    pub fn position_of(&self, id: &EntityId) -> Option<Position> {
        self.row_of(id).map(Position::row)
    }

    /// Returns the entity at `position`, if it is within the results.
    pub fn entity_at(&self, position: Position) -> Option<&Rc<Entity>> {
        if position.section != 0 {
            return None;
        }
        self.entries.get(position.row).map(|entry| &entry.entity)
    }

    /// Returns the index of the lowest query `id` matched.
    pub fn query_of(&self, id: &EntityId) -> Option<usize> {
        self.row_of(id).map(|row| self.entries[row].query)
    }

    #[inline]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains(id)
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<MergedEntry>, &mut PositionIndex) {
        (&mut self.entries, &mut self.index)
    }

    pub(crate) fn index(&self) -> &PositionIndex {
        &self.index
    }
}
