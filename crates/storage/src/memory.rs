//! In-memory reference store.
//!
//! `MemoryStore` keeps entities in store-native order, journals mutations
//! until `save()`, and then notifies subscribers with the coalesced changes.
//! Queries see pending mutations immediately, as an object context would.

use crate::adapter::StoreAdapter;
use crate::journal::ChangeJournal;
use crate::notification::{ChangeNotification, NotificationHandler, StoreEvent, SubscriptionId};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use multifetch_core::{Entity, EntityId, EntityKind, Error, Result};
use multifetch_query::QuerySpec;

struct Subscriber {
    kinds: Vec<EntityKind>,
    handler: NotificationHandler,
}

/// A single-context in-memory entity store.
pub struct MemoryStore {
    entities: BTreeMap<EntityId, Rc<Entity>>,
    journal: ChangeJournal,
    /// Ordered by id so dispatch order is deterministic
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    next_subscription: SubscriptionId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            journal: ChangeJournal::new(),
            subscribers: BTreeMap::new(),
            next_subscription: 1,
        }
    }

    /// Adds a new entity.
    pub fn insert(&mut self, entity: Entity) -> Result<Rc<Entity>> {
        if self.entities.contains_key(entity.id()) {
            return Err(Error::duplicate_entity(entity.id().clone()));
        }
        let entity = Rc::new(entity);
        self.entities.insert(entity.id().clone(), entity.clone());
        self.journal.record_insert(entity.clone());
        Ok(entity)
    }

    /// Replaces an existing entity with a new snapshot, bumping its version.
    pub fn update(&mut self, mut entity: Entity) -> Result<Rc<Entity>> {
        let Some(current) = self.entities.get_mut(entity.id()) else {
            return Err(Error::entity_not_found(entity.id().clone()));
        };
        entity.set_version(current.version().wrapping_add(1));
        let entity = Rc::new(entity);
        *current = entity.clone();
        self.journal.record_update(entity.clone());
        Ok(entity)
    }

    /// Applies `f` to a copy of the current snapshot and stores the result.
    pub fn modify<F>(&mut self, id: &EntityId, f: F) -> Result<Rc<Entity>>
    where
        F: FnOnce(&mut Entity),
    {
        let mut next = self
            .entities
            .get(id)
            .map(|current| Entity::clone(current))
            .ok_or_else(|| Error::entity_not_found(id.clone()))?;
        f(&mut next);
        self.update(next)
    }

    /// Deletes an entity, returning its last snapshot.
    pub fn delete(&mut self, id: &EntityId) -> Result<Rc<Entity>> {
        let entity = self
            .entities
            .remove(id)
            .ok_or_else(|| Error::entity_not_found(id.clone()))?;
        self.journal.record_delete(entity.clone());
        Ok(entity)
    }

    /// Evicts an entity from this store without deleting it elsewhere.
    ///
    /// Subscribers see the eviction in the `deleted` set, exactly like a
    /// deletion.
    pub fn invalidate(&mut self, id: &EntityId) -> Result<Rc<Entity>> {
        log::trace!("invalidating {}", id);
        self.delete(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<Rc<Entity>> {
        self.entities.get(id).cloned()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Iterates all entities in store-native order.
    pub fn entities(&self) -> impl Iterator<Item = &Rc<Entity>> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns true if there are unsaved mutations.
    pub fn has_changes(&self) -> bool {
        !self.journal.is_empty()
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Commits pending mutations and notifies subscribers.
    ///
    /// Each subscriber receives only the changes touching its kinds, and is
    /// skipped when there are none. Returns the full notification.
    pub fn save(&mut self) -> ChangeNotification {
        let notification = self.journal.take();
        if notification.is_empty() {
            return notification;
        }
        log::trace!(
            "saving {} inserted, {} updated, {} deleted",
            notification.inserted.len(),
            notification.updated.len(),
            notification.deleted.len()
        );

        for (id, subscriber) in &self.subscribers {
            let scoped = notification.restricted_to(&subscriber.kinds);
            if scoped.is_empty() {
                continue;
            }
            log::trace!("notifying subscription {} of {} changes", id, scoped.len());
            (subscriber.handler)(&StoreEvent::Changed(scoped));
        }
        notification
    }

    /// Drops every subscription, telling each subscriber it was detached.
    pub fn detach_all(&mut self) {
        let subscribers = core::mem::take(&mut self.subscribers);
        for (id, subscriber) in subscribers {
            log::debug!("detaching subscription {}", id);
            (subscriber.handler)(&StoreEvent::Detached);
        }
    }
}

impl StoreAdapter for MemoryStore {
    fn execute_query(&self, spec: &QuerySpec) -> Result<Vec<Rc<Entity>>> {
        let start = EntityId::new(spec.kind().clone(), 0);
        let end = EntityId::new(spec.kind().clone(), u64::MAX);

        let mut matched = Vec::new();
        for entity in self.entities.range(start..=end).map(|(_, e)| e) {
            match spec.matches(entity) {
                Ok(true) => matched.push(entity.clone()),
                Ok(false) => {}
                Err(err) => log::trace!("skipping {}: {}", entity.id(), err),
            }
        }
        Ok(matched)
    }

    fn subscribe(&mut self, kinds: Vec<EntityKind>, handler: NotificationHandler) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.insert(id, Subscriber { kinds, handler });
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }
}
