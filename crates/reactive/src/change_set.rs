//! Change records produced by the diff engine.
//!
//! A `ChangeSet` is an ordered list of `ChangeRecord`s describing how the
//! merged sequence moved from one state to the next. Positions follow the
//! batch convention of positional list views:
//!
//! - `Delete` and the source of a `Move` refer to rows *before* the batch
//! - `Insert` and the destination of a `Move` refer to rows *after* it
//! - `Update` carries both; the entity kept its place relative to its
//!   neighbours, although its row may have shifted numerically
//!
//! Records are ordered deletes (descending old row), then inserts
//! (ascending new row), then moves and updates (ascending new row), so a
//! consumer can replay them one by one with `ChangeSet::apply_to`.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use multifetch_core::{Entity, Error, Result};

/// Kind of change reported for one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChangeKind {
    Insert = 1,
    Delete = 2,
    Move = 3,
    Update = 4,
}

/// A (section, row) position in the merged sequence.
///
/// Results are never grouped, so the section is always 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub section: usize,
    pub row: usize,
}

impl Position {
    #[inline]
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }

    /// Position of `row` in the single implicit section.
    #[inline]
    pub fn row(row: usize) -> Self {
        Self::new(0, row)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// One classified change.
///
/// `Insert` has no old position, `Delete` has no new position, `Move` and
/// `Update` have both. The constructors are the only way to build one.
#[derive(Clone, Debug)]
pub struct ChangeRecord {
    entity: Rc<Entity>,
    old_position: Option<Position>,
    new_position: Option<Position>,
    kind: ChangeKind,
}

impl ChangeRecord {
    pub fn insert(entity: Rc<Entity>, new_row: usize) -> Self {
        Self {
            entity,
            old_position: None,
            new_position: Some(Position::row(new_row)),
            kind: ChangeKind::Insert,
        }
    }

    pub fn delete(entity: Rc<Entity>, old_row: usize) -> Self {
        Self {
            entity,
            old_position: Some(Position::row(old_row)),
            new_position: None,
            kind: ChangeKind::Delete,
        }
    }

    pub fn moved(entity: Rc<Entity>, old_row: usize, new_row: usize) -> Self {
        Self {
            entity,
            old_position: Some(Position::row(old_row)),
            new_position: Some(Position::row(new_row)),
            kind: ChangeKind::Move,
        }
    }

    pub fn update(entity: Rc<Entity>, old_row: usize, new_row: usize) -> Self {
        Self {
            entity,
            old_position: Some(Position::row(old_row)),
            new_position: Some(Position::row(new_row)),
            kind: ChangeKind::Update,
        }
    }

    /// The entity snapshot the change refers to.
    ///
    /// For deletes this is the last snapshot the store reported.
    #[inline]
    pub fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }

    #[inline]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[inline]
    pub fn old_position(&self) -> Option<Position> {
        self.old_position
    }

    #[inline]
    pub fn new_position(&self) -> Option<Position> {
        self.new_position
    }
}

/// An ordered batch of change records.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    /// Returns the number of records of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Replays this batch onto a positional mirror of the merged sequence.
    ///
    /// Rows of deletes and move sources are removed (descending), rows of
    /// inserts and move destinations are filled with `make(entity)`
    /// (ascending), and updated rows are replaced in place. Fails without
    /// touching `mirror` if a row is out of range for it.
    pub fn apply_to<T, F>(&self, mirror: &mut Vec<T>, mut make: F) -> Result<()>
    where
        F: FnMut(&Rc<Entity>) -> T,
    {
        let mut removals: Vec<usize> = Vec::new();
        let mut insertions: Vec<(usize, &Rc<Entity>)> = Vec::new();
        let mut updates: Vec<(usize, &Rc<Entity>)> = Vec::new();

        for record in &self.records {
            let old = record.old_position.map(|p| p.row);
            let new = record.new_position.map(|p| p.row);
            match (record.kind, old, new) {
                (ChangeKind::Delete, Some(old), _) => removals.push(old),
                (ChangeKind::Insert, _, Some(new)) => insertions.push((new, &record.entity)),
                (ChangeKind::Move, Some(old), Some(new)) => {
                    removals.push(old);
                    insertions.push((new, &record.entity));
                }
                (ChangeKind::Update, _, Some(new)) => updates.push((new, &record.entity)),
                _ => {}
            }
        }

        removals.sort_unstable_by(|a, b| b.cmp(a));
        removals.dedup();
        insertions.sort_by_key(|(row, _)| *row);

        // validate against the lengths the mirror will have at each step
        if removals.first().is_some_and(|&row| row >= mirror.len()) {
            return Err(Error::invalid_operation("delete row out of range for mirror"));
        }
        let mut len = mirror.len() - removals.len();
        for (row, _) in &insertions {
            if *row > len {
                return Err(Error::invalid_operation("insert row out of range for mirror"));
            }
            len += 1;
        }
        if updates.iter().any(|(row, _)| *row >= len) {
            return Err(Error::invalid_operation("update row out of range for mirror"));
        }

        for row in removals {
            mirror.remove(row);
        }
        for (row, entity) in insertions {
            mirror.insert(row, make(entity));
        }
        for (row, entity) in updates {
            mirror[row] = make(entity);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeRecord;
    type IntoIter = core::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
