//! Journal of pending mutations for one unit of work.
//!
//! The journal coalesces every mutation an entity receives before a save
//! into at most one net change, so subscribers see each entity once per
//! notification.

use crate::notification::ChangeNotification;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use multifetch_core::{Entity, EntityId};

/// Pending changes keyed by entity identity.
#[derive(Clone, Debug, Default)]
pub struct ChangeJournal {
    /// Entities added since the last save.
    added: BTreeMap<EntityId, Rc<Entity>>,
    /// Entities modified since the last save (latest snapshot).
    modified: BTreeMap<EntityId, Rc<Entity>>,
    /// Entities deleted or invalidated since the last save (last snapshot).
    deleted: BTreeMap<EntityId, Rc<Entity>>,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insertion.
    pub fn record_insert(&mut self, entity: Rc<Entity>) {
        let id = entity.id().clone();
        // deleted and re-inserted within one unit of work: net effect is an update
        if self.deleted.remove(&id).is_some() {
            self.modified.insert(id, entity);
        } else {
            self.added.insert(id, entity);
        }
    }

    /// Records an update.
    pub fn record_update(&mut self, entity: Rc<Entity>) {
        let id = entity.id().clone();
        if let Some(slot) = self.added.get_mut(&id) {
            *slot = entity;
        } else {
            self.modified.insert(id, entity);
        }
    }

    /// Records a deletion or invalidation.
    pub fn record_delete(&mut self, entity: Rc<Entity>) {
        let id = entity.id().clone();
        // added and removed within one unit of work: nothing to report
        if self.added.remove(&id).is_some() {
            return;
        }
        self.modified.remove(&id);
        self.deleted.insert(id, entity);
    }

    /// Returns true if there are no pending changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Returns the number of entities with pending changes.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Drains the journal into a notification, in identity order.
    pub fn take(&mut self) -> ChangeNotification {
        let added = core::mem::take(&mut self.added);
        let modified = core::mem::take(&mut self.modified);
        let deleted = core::mem::take(&mut self.deleted);
        ChangeNotification {
            inserted: added.into_values().collect(),
            updated: modified.into_values().collect(),
            deleted: deleted.into_values().collect(),
        }
    }
}
