//! Change notifications delivered by a store.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use hashbrown::HashSet;
use multifetch_core::{Entity, EntityKind};

/// Identifier of a store subscription.
pub type SubscriptionId = u64;

/// Callback invoked by a store for each event.
pub type NotificationHandler = Box<dyn Fn(&StoreEvent)>;

/// The entities touched by one unit of work.
///
/// Each list holds an entity at most once. Inserted and updated entries
/// carry the new snapshot; deleted entries carry the last known snapshot.
#[derive(Clone, Debug, Default)]
pub struct ChangeNotification {
    /// Entities added to the store
    pub inserted: Vec<Rc<Entity>>,
    /// Entities whose fields changed
    pub updated: Vec<Rc<Entity>>,
    /// Entities deleted from the store or invalidated
    pub deleted: Vec<Rc<Entity>>,
}

impl ChangeNotification {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Returns the total number of changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }

    pub fn insert(&mut self, entity: Rc<Entity>) {
        self.inserted.push(entity);
    }

    pub fn update(&mut self, entity: Rc<Entity>) {
        self.updated.push(entity);
    }

    pub fn delete(&mut self, entity: Rc<Entity>) {
        self.deleted.push(entity);
    }

    /// Returns the distinct entity kinds mentioned, in first-seen order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut seen = HashSet::new();
        let mut kinds = Vec::new();
        for entity in self.inserted.iter().chain(&self.updated).chain(&self.deleted) {
            if seen.insert(entity.kind().clone()) {
                kinds.push(entity.kind().clone());
            }
        }
        kinds
    }

    /// Returns the subset of this notification touching the given kinds.
    pub fn restricted_to(&self, kinds: &[EntityKind]) -> ChangeNotification {
        let keep = |e: &&Rc<Entity>| kinds.contains(e.kind());
        ChangeNotification {
            inserted: self.inserted.iter().filter(keep).cloned().collect(),
            updated: self.updated.iter().filter(keep).cloned().collect(),
            deleted: self.deleted.iter().filter(keep).cloned().collect(),
        }
    }
}

/// An event a store delivers to its subscribers.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    /// A unit of work was saved.
    Changed(ChangeNotification),
    /// The store dropped this subscription; no further events follow.
    Detached,
}
