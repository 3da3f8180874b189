//! Incremental maintenance of the merged sequence.
//!
//! `DiffEngine::apply` folds one store notification into `FetchedResults`
//! and classifies what happened to every touched entity:
//!
//! | before | after   | position relative to neighbours | record |
//! |--------|---------|---------------------------------|--------|
//! | absent | present | -                               | Insert |
//! | present| absent  | -                               | Delete |
//! | present| present | unchanged                       | Update |
//! | present| present | changed                         | Move   |
//!
//! Deleted entities are looked at first; an entity that is both deleted
//! and re-reported in the same notification counts as deleted. Membership
//! is recomputed from the new snapshot with the query predicates, and the
//! new row is found by binary search under the combined order, so the
//! sequence stays sorted without a full re-sort.
//!
//! An updated entity is an update, not a move, when it still sits between
//! the same untouched neighbours; rows deleted in the same batch do not
//! count. When several updated neighbours cross each other, the later one
//! in the old order is reported as moved.

use crate::change_set::{ChangeRecord, ChangeSet};
use crate::merger::membership;
use crate::results::FetchedResults;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::{HashMap, HashSet};
use multifetch_core::Entity;
use multifetch_query::{CombinedOrder, MergedEntry, QuerySpec};
use multifetch_storage::ChangeNotification;

/// Applies store notifications to fetched results.
pub struct DiffEngine<'a> {
    specs: &'a [QuerySpec],
    order: &'a CombinedOrder,
}

/// What a notification means for one entity already in the results.
struct Changed {
    old_row: usize,
    entry: MergedEntry,
}

impl<'a> DiffEngine<'a> {
    pub fn new(specs: &'a [QuerySpec], order: &'a CombinedOrder) -> Self {
        Self { specs, order }
    }

    /// Folds `notification` into `results`.
    ///
    /// The returned records are ordered deletes (descending old row),
    /// inserts (ascending new row), then moves and updates (ascending new
    /// row). With `emit_records` false the results are still maintained
    /// but no records are built.
    pub fn apply(
        &self,
        results: &mut FetchedResults,
        notification: &ChangeNotification,
        emit_records: bool,
    ) -> ChangeSet {
        let mut removals: Vec<(usize, Rc<Entity>)> = Vec::new();
        let mut insertions: Vec<MergedEntry> = Vec::new();
        let mut changed: Vec<Changed> = Vec::new();

        let mut seen = HashSet::new();
        for entity in &notification.deleted {
            if !seen.insert(entity.id().clone()) {
                continue;
            }
            if let Some(row) = results.row_of(entity.id()) {
                removals.push((row, entity.clone()));
            }
        }
        for entity in notification.inserted.iter().chain(&notification.updated) {
            if !seen.insert(entity.id().clone()) {
                continue;
            }
            let query = membership(self.specs, entity);
            match (results.row_of(entity.id()), query) {
                (Some(row), Some(query)) => changed.push(Changed {
                    old_row: row,
                    entry: MergedEntry::new(entity.clone(), query),
                }),
                (Some(row), None) => removals.push((row, entity.clone())),
                (None, Some(query)) => insertions.push(MergedEntry::new(entity.clone(), query)),
                (None, None) => {}
            }
        }

        if removals.is_empty() && insertions.is_empty() && changed.is_empty() {
            return ChangeSet::new();
        }

        let (updates, moves) = self.classify(results.entries(), &removals, changed);
        log::trace!(
            "diff: {} removed, {} inserted, {} moved, {} updated",
            removals.len(),
            insertions.len(),
            moves.len(),
            updates.len()
        );

        let (entries, index) = results.parts_mut();

        for update in &updates {
            entries[update.old_row] = update.entry.clone();
        }

        let mut vacated: Vec<usize> = removals
            .iter()
            .map(|(row, _)| *row)
            .chain(moves.iter().map(|m| m.old_row))
            .collect();
        vacated.sort_unstable_by(|a, b| b.cmp(a));
        let mut first_dirty = vacated.last().copied().unwrap_or(entries.len());
        for &row in &vacated {
            entries.remove(row);
        }
        for (_, entity) in &removals {
            index.remove(entity.id());
        }

        let mut additions: Vec<MergedEntry> = insertions
            .iter()
            .cloned()
            .chain(moves.iter().map(|m| m.entry.clone()))
            .collect();
        self.order.sort(&mut additions);
        for entry in additions {
            // ascending insertion: later additions land after earlier ones
            let row = self.order.insertion_point(entries, &entry);
            first_dirty = first_dirty.min(row);
            entries.insert(row, entry);
        }
        index.reindex_from(entries, first_dirty);

        debug_assert!(self.order.is_sorted(results.entries()));
        debug_assert!(results.index().is_consistent_with(results.entries()));

        if !emit_records {
            return ChangeSet::new();
        }
        self.records(results, removals, insertions, moves, updates)
    }

    /// Splits entities that stayed in the results into updates and moves.
    fn classify(
        &self,
        entries: &[MergedEntry],
        removals: &[(usize, Rc<Entity>)],
        changed: Vec<Changed>,
    ) -> (Vec<Changed>, Vec<Changed>) {
        // entities that survive the batch untouched, in old order
        let mut touched: HashSet<usize> = removals.iter().map(|(row, _)| *row).collect();
        touched.extend(changed.iter().map(|c| c.old_row));
        let anchors: Vec<usize> = (0..entries.len())
            .filter(|row| !touched.contains(row))
            .collect();

        let mut updates = Vec::new();
        let mut moves = Vec::new();
        for change in changed {
            // the gap between anchors the entity sat in, and the one it belongs in now
            let slot = anchors.partition_point(|&row| row < change.old_row);
            let target = anchors.partition_point(|&row| {
                self.order.compare(&entries[row], &change.entry) == Ordering::Less
            });
            if slot == target {
                updates.push(change);
            } else {
                moves.push(change);
            }
        }
        if updates.len() < 2 {
            return (updates, moves);
        }

        // Each update is in order against the anchors, but two updated
        // neighbours in the same gap may now be out of order with each other.
        let mut skipped: HashSet<usize> = removals.iter().map(|(row, _)| *row).collect();
        skipped.extend(moves.iter().map(|m| m.old_row));
        let update_at: HashMap<usize, usize> = updates
            .iter()
            .enumerate()
            .map(|(i, u)| (u.old_row, i))
            .collect();
        let effective = |row: usize| match update_at.get(&row) {
            Some(&i) => &updates[i].entry,
            None => &entries[row],
        };

        let mut demoted: HashSet<usize> = HashSet::new();
        let mut kept: Vec<usize> = Vec::new();
        for row in 0..entries.len() {
            if skipped.contains(&row) {
                continue;
            }
            let current = effective(row);
            let mut keep = true;
            while let Some(&top) = kept.last() {
                if self.order.compare(effective(top), current) != Ordering::Greater {
                    break;
                }
                if update_at.contains_key(&row) {
                    demoted.insert(row);
                    keep = false;
                    break;
                }
                if update_at.contains_key(&top) {
                    kept.pop();
                    demoted.insert(top);
                    continue;
                }
                break;
            }
            if keep {
                kept.push(row);
            }
        }

        if !demoted.is_empty() {
            let (stay, go): (Vec<Changed>, Vec<Changed>) = updates
                .into_iter()
                .partition(|u| !demoted.contains(&u.old_row));
            moves.extend(go);
            return (stay, moves);
        }
        (updates, moves)
    }

    fn records(
        &self,
        results: &FetchedResults,
        removals: Vec<(usize, Rc<Entity>)>,
        insertions: Vec<MergedEntry>,
        moves: Vec<Changed>,
        updates: Vec<Changed>,
    ) -> ChangeSet {
        let mut deletes: Vec<ChangeRecord> = removals
            .into_iter()
            .map(|(row, entity)| ChangeRecord::delete(entity, row))
            .collect();
        deletes.sort_by_key(|r| core::cmp::Reverse(r.old_position()));

        let mut inserts: Vec<ChangeRecord> = insertions
            .into_iter()
            .filter_map(|entry| {
                let row = results.row_of(entry.id())?;
                Some(ChangeRecord::insert(entry.entity, row))
            })
            .collect();
        inserts.sort_by_key(|r| r.new_position());

        let mut relocated: Vec<ChangeRecord> = moves
            .into_iter()
            .filter_map(|m| {
                let row = results.row_of(m.entry.id())?;
                Some(ChangeRecord::moved(m.entry.entity, m.old_row, row))
            })
            .chain(updates.into_iter().filter_map(|u| {
                let row = results.row_of(u.entry.id())?;
                Some(ChangeRecord::update(u.entry.entity, u.old_row, row))
            }))
            .collect();
        relocated.sort_by_key(|r| r.new_position());

        let mut records = deletes;
        records.append(&mut inserts);
        records.append(&mut relocated);
        ChangeSet::from_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_set::{ChangeKind, Position};
    use alloc::vec;
    use multifetch_core::{EntityId, Value};
    use multifetch_query::{Predicate, SortKey};

    fn ranked(key: u64, rank: i64) -> Rc<Entity> {
        Rc::new(Entity::new(EntityId::new("people", key)).with("rank", rank))
    }

    fn specs() -> Vec<QuerySpec> {
        vec![QuerySpec::new("people")
            .filter(Predicate::lt("rank", 100i64))
            .sort_by(SortKey::asc("rank"))]
    }

    fn fetched(order: &CombinedOrder, ranks: &[(u64, i64)]) -> FetchedResults {
        let mut entries: Vec<MergedEntry> = ranks
            .iter()
            .map(|&(k, r)| MergedEntry::new(ranked(k, r), 0))
            .collect();
        order.sort(&mut entries);
        FetchedResults::from_entries(entries)
    }

    fn ranks(results: &FetchedResults) -> Vec<i64> {
        results
            .iter()
            .map(|e| e.get("rank").and_then(Value::as_i64).unwrap())
            .collect()
    }

    fn summary(cs: &ChangeSet) -> Vec<(ChangeKind, Option<usize>, Option<usize>)> {
        cs.iter()
            .map(|r| {
                (
                    r.kind(),
                    r.old_position().map(|p| p.row),
                    r.new_position().map(|p| p.row),
                )
            })
            .collect()
    }

    fn check_mirror(before: &[i64], cs: &ChangeSet, after: &FetchedResults) {
        let mut mirror = before.to_vec();
        cs.apply_to(&mut mirror, |e| e.get("rank").and_then(Value::as_i64).unwrap())
            .unwrap();
        assert_eq!(mirror, ranks(after));
    }

    #[test]
    fn test_insert_between_neighbours() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3), (3, 10)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(4, 5));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![1, 3, 5, 10]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Insert, None, Some(2))]);
    }

    #[test]
    fn test_delete_first() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3), (3, 10)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.delete(ranked(1, 1));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![3, 10]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Delete, Some(0), None)]);
        assert!(results.position_of(&EntityId::new("people", 1)).is_none());
        assert_eq!(
            results.position_of(&EntityId::new("people", 2)),
            Some(Position::row(0))
        );
    }

    #[test]
    fn test_insert_at_boundaries() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 5)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(2, 1));
        n.insert(ranked(3, 9));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![1, 5, 9]);
        assert_eq!(
            summary(&cs),
            vec![
                (ChangeKind::Insert, None, Some(0)),
                (ChangeKind::Insert, None, Some(2)),
            ]
        );
        check_mirror(&[5], &cs, &results);
    }

    #[test]
    fn test_insert_into_empty() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = FetchedResults::default();
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(1, 7));
        let cs = engine.apply(&mut results, &n, true);
        assert_eq!(summary(&cs), vec![(ChangeKind::Insert, None, Some(0))]);
    }

    #[test]
    fn test_update_in_place() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3), (3, 10)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(2, 4));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![1, 4, 10]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Update, Some(1), Some(1))]);
        assert_eq!(
            cs.records()[0].entity().get("rank"),
            Some(&Value::Int64(4))
        );
    }

    #[test]
    fn test_move_forward() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3), (3, 10)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(1, 20));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![3, 10, 20]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Move, Some(0), Some(2))]);
        check_mirror(&[1, 3, 10], &cs, &results);
    }

    #[test]
    fn test_move_backward() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3), (3, 10)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(3, 0));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![0, 1, 3]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Move, Some(2), Some(0))]);
    }

    #[test]
    fn test_update_leaving_membership_is_delete() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(2, 500));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![1]);
        assert_eq!(summary(&cs), vec![(ChangeKind::Delete, Some(1), None)]);
        assert_eq!(
            cs.records()[0].entity().get("rank"),
            Some(&Value::Int64(500))
        );
    }

    #[test]
    fn test_update_entering_membership_is_insert() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(9, 50));
        let cs = engine.apply(&mut results, &n, true);
        assert_eq!(summary(&cs), vec![(ChangeKind::Insert, None, Some(1))]);
    }

    #[test]
    fn test_irrelevant_changes_are_ignored() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(5, 900));
        n.delete(ranked(6, 2));
        n.insert(Rc::new(Entity::new(EntityId::new("animal", 1)).with("rank", 1i64)));
        let cs = engine.apply(&mut results, &n, true);
        assert!(cs.is_empty());
        assert_eq!(ranks(&results), vec![1]);
    }

    #[test]
    fn test_deleted_wins_over_update() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.update(ranked(1, 2));
        n.delete(ranked(1, 2));
        let cs = engine.apply(&mut results, &n, true);
        assert_eq!(summary(&cs), vec![(ChangeKind::Delete, Some(0), None)]);
    }

    #[test]
    fn test_insert_of_present_entity_is_update() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(2, 3));
        let cs = engine.apply(&mut results, &n, true);
        assert_eq!(summary(&cs), vec![(ChangeKind::Update, Some(1), Some(1))]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_swapped_updates_report_a_move() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 2), (3, 3), (4, 4)]);
        let engine = DiffEngine::new(&specs, &order);

        // 2 and 3 trade places; neither crosses an untouched neighbour
        let mut n = ChangeNotification::new();
        n.update(ranked(2, 3));
        n.update(ranked(3, 2));
        let before = ranks(&results);
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![1, 2, 3, 4]);
        assert_eq!(results.row_of(&EntityId::new("people", 3)), Some(1));
        assert_eq!(cs.count(ChangeKind::Move), 1);
        assert_eq!(cs.count(ChangeKind::Update), 1);
        check_mirror(&before, &cs, &results);
    }

    #[test]
    fn test_passing_a_deleted_row_is_update() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 10), (2, 20), (3, 30)]);
        let engine = DiffEngine::new(&specs, &order);
        let before = ranks(&results);

        // 1 overtakes 2, but 2 leaves in the same batch
        let mut n = ChangeNotification::new();
        n.delete(ranked(2, 20));
        n.update(ranked(1, 25));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![25, 30]);
        assert_eq!(
            summary(&cs),
            vec![
                (ChangeKind::Delete, Some(1), None),
                (ChangeKind::Update, Some(0), Some(0)),
            ]
        );
        check_mirror(&before, &cs, &results);
    }

    #[test]
    fn test_update_crossing_another_update_reports_one_move() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 10), (2, 20), (3, 30), (4, 40)]);
        let engine = DiffEngine::new(&specs, &order);
        let before = ranks(&results);

        // 3 jumps ahead of 1 while 1 changes in place
        let mut n = ChangeNotification::new();
        n.update(ranked(1, 11));
        n.update(ranked(3, 5));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![5, 11, 20, 40]);
        assert_eq!(
            summary(&cs),
            vec![
                (ChangeKind::Move, Some(2), Some(0)),
                (ChangeKind::Update, Some(0), Some(1)),
            ]
        );
        check_mirror(&before, &cs, &results);
    }

    #[test]
    fn test_mixed_batch_matches_mirror() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)]);
        let engine = DiffEngine::new(&specs, &order);
        let before = ranks(&results);

        let mut n = ChangeNotification::new();
        n.delete(ranked(2, 20));
        n.insert(ranked(6, 35));
        n.insert(ranked(7, 5));
        n.update(ranked(5, 15));
        n.update(ranked(3, 31));
        n.update(ranked(4, 400));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![5, 10, 15, 31, 35]);
        assert_eq!(cs.count(ChangeKind::Delete), 2);
        assert_eq!(cs.count(ChangeKind::Insert), 2);
        assert_eq!(cs.count(ChangeKind::Move), 1);
        assert_eq!(cs.count(ChangeKind::Update), 1);
        check_mirror(&before, &cs, &results);

        let kinds: Vec<ChangeKind> = cs.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Delete,
                ChangeKind::Delete,
                ChangeKind::Insert,
                ChangeKind::Insert,
                ChangeKind::Move,
                ChangeKind::Update,
            ]
        );
        // deletes descend by old row
        assert_eq!(cs.records()[0].old_position(), Some(Position::row(3)));
        assert_eq!(cs.records()[1].old_position(), Some(Position::row(1)));
    }

    #[test]
    fn test_without_records_still_maintains_results() {
        let specs = specs();
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let mut results = fetched(&order, &[(1, 1), (2, 3)]);
        let engine = DiffEngine::new(&specs, &order);

        let mut n = ChangeNotification::new();
        n.insert(ranked(3, 2));
        n.delete(ranked(1, 1));
        let cs = engine.apply(&mut results, &n, false);
        assert!(cs.is_empty());
        assert_eq!(ranks(&results), vec![2, 3]);
        assert_eq!(results.row_of(&EntityId::new("people", 2)), Some(1));
    }

    #[test]
    fn test_membership_change_between_queries() {
        let specs = vec![
            QuerySpec::new("people")
                .filter(Predicate::ge("rank", 50i64))
                .sort_by(SortKey::desc("rank")),
            QuerySpec::new("people").filter(Predicate::lt("rank", 50i64)),
        ];
        let order = CombinedOrder::new(&specs, &[]).unwrap();
        let engine = DiffEngine::new(&specs, &order);
        let mut results = FetchedResults::from_entries({
            let mut e = vec![
                MergedEntry::new(ranked(1, 60), 0),
                MergedEntry::new(ranked(2, 10), 1),
            ];
            order.sort(&mut e);
            e
        });

        let mut n = ChangeNotification::new();
        n.update(ranked(2, 70));
        let cs = engine.apply(&mut results, &n, true);

        assert_eq!(ranks(&results), vec![70, 60]);
        assert_eq!(results.query_of(&EntityId::new("people", 2)), Some(0));
        assert_eq!(summary(&cs), vec![(ChangeKind::Move, Some(1), Some(0))]);
    }
}
