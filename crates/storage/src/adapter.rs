//! The contract between a results controller and the store it observes.

use crate::notification::{NotificationHandler, SubscriptionId};
use alloc::rc::Rc;
use alloc::vec::Vec;
use multifetch_core::{Entity, EntityKind, Result};
use multifetch_query::QuerySpec;

/// A store that can run queries and report saved mutations.
///
/// Implementations are single-threaded: queries run, and handlers are
/// invoked, on the context that owns the store.
pub trait StoreAdapter {
    /// Returns the entities currently matching `spec`, in store-native order.
    ///
    /// Entities whose predicate evaluation faults are left out.
    fn execute_query(&self, spec: &QuerySpec) -> Result<Vec<Rc<Entity>>>;

    /// Registers `handler` for changes touching any of `kinds`.
    fn subscribe(&mut self, kinds: Vec<EntityKind>, handler: NotificationHandler) -> SubscriptionId;

    /// Removes a subscription. Returns false if it was unknown.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}
