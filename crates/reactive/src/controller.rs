//! The results controller and its tracking lifecycle.
//!
//! ```text
//! NotFetched --fetch--> Fetched --set_observer(Some)--> Tracking
//!                          ^                               |
//!                          +--set_observer(None)/detach----+
//! any --close/drop--> Destroyed
//! ```
//!
//! Setting a tracking observer before the first fetch is allowed; the
//! subscription starts when the fetch succeeds.

use crate::change_set::Position;
use crate::diff::DiffEngine;
use crate::merger::ResultMerger;
use crate::observer::ResultsObserver;
use crate::results::FetchedResults;
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use multifetch_core::{Entity, EntityId, EntityKind, Error, Result};
use multifetch_query::{CombinedOrder, QuerySpec, SortKey};
use multifetch_storage::{NotificationHandler, StoreAdapter, StoreEvent, SubscriptionId};

/// Where a controller is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    /// No successful fetch yet
    NotFetched,
    /// Results are available but store changes are not followed
    Fetched,
    /// Subscribed to the store; results follow every saved change
    Tracking,
    /// Closed; no further operations are accepted
    Destroyed,
}

/// Configures and builds a `ResultsController`.
#[derive(Clone, Debug, Default)]
pub struct ControllerBuilder {
    specs: Vec<QuerySpec>,
    sort_keys: Vec<SortKey>,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query.
    pub fn query(mut self, spec: QuerySpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Appends several queries.
    pub fn queries<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = QuerySpec>,
    {
        self.specs.extend(specs);
        self
    }

    /// Appends a global sort key. Global keys take precedence over the
    /// keys of individual queries.
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.sort_keys.push(key);
        self
    }

    /// Appends several global sort keys.
    pub fn sort_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = SortKey>,
    {
        self.sort_keys.extend(keys);
        self
    }

    /// Builds a controller over `store`. Nothing is fetched yet.
    pub fn build<S: StoreAdapter>(self, store: Rc<RefCell<S>>) -> ResultsController<S> {
        let state = ControllerState {
            specs: self.specs.into(),
            global_sort_keys: self.sort_keys,
            order: None,
            results: None,
            observer: None,
            subscription: None,
            destroyed: false,
        };
        ResultsController {
            store,
            state: Rc::new(RefCell::new(state)),
        }
    }
}

/// State shared between the controller and its store subscription.
struct ControllerState {
    specs: Rc<[QuerySpec]>,
    global_sort_keys: Vec<SortKey>,
    order: Option<CombinedOrder>,
    results: Option<FetchedResults>,
    observer: Option<ResultsObserver>,
    subscription: Option<SubscriptionId>,
    destroyed: bool,
}

impl ControllerState {
    fn tracking_state(&self) -> TrackingState {
        if self.destroyed {
            TrackingState::Destroyed
        } else if self.subscription.is_some() {
            TrackingState::Tracking
        } else if self.results.is_some() {
            TrackingState::Fetched
        } else {
            TrackingState::NotFetched
        }
    }

    /// Distinct entity kinds the queries read, in query order.
    fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = Vec::new();
        for spec in self.specs.iter() {
            if !kinds.contains(spec.kind()) {
                kinds.push(spec.kind().clone());
            }
        }
        kinds
    }

    fn on_store_event(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::Changed(notification) => {
                let ControllerState {
                    specs,
                    order,
                    results,
                    observer,
                    subscription,
                    ..
                } = self;
                if subscription.is_none() {
                    return;
                }
                let (Some(order), Some(results), Some(observer)) =
                    (order.as_ref(), results.as_mut(), observer.as_mut())
                else {
                    return;
                };

                let engine = DiffEngine::new(specs, order);
                observer.will_change(results);
                let changes = engine.apply(results, notification, observer.wants_records());
                for record in &changes {
                    observer.did_change_object(results, record);
                }
                observer.did_change(results);
            }
            StoreEvent::Detached => {
                if let Some(id) = self.subscription.take() {
                    log::warn!("store detached subscription {}; change tracking stopped", id);
                }
            }
        }
    }
}

/// Runs several queries against one store as a single sorted result set
/// and, while an observer is set, keeps that set current as the store
/// changes.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use multifetch_core::{Entity, EntityId};
/// use multifetch_query::{Predicate, QuerySpec, SortKey};
/// use multifetch_reactive::{ControllerBuilder, ResultsObserver, TrackingState};
/// use multifetch_storage::MemoryStore;
///
/// let store = Rc::new(RefCell::new(MemoryStore::new()));
/// store
///     .borrow_mut()
///     .insert(Entity::new(EntityId::new("people", 1)).with("age", 30i64))
///     .unwrap();
///
/// let mut controller = ControllerBuilder::new()
///     .query(QuerySpec::new("people").filter(Predicate::gt("age", 18i64)))
///     .sort_key(SortKey::asc("age"))
///     .build(store.clone());
/// controller.fetch().unwrap();
/// controller.set_observer(Some(ResultsObserver::new().on_did_change_object(|_, record| {
///     let _ = record.kind();
/// })));
/// assert_eq!(controller.tracking_state(), TrackingState::Tracking);
///
/// store
///     .borrow_mut()
///     .insert(Entity::new(EntityId::new("people", 2)).with("age", 20i64))
///     .unwrap();
/// store.borrow_mut().save();
/// assert_eq!(controller.fetched_count(), 2);
/// ```
pub struct ResultsController<S: StoreAdapter> {
    store: Rc<RefCell<S>>,
    state: Rc<RefCell<ControllerState>>,
}

impl<S: StoreAdapter> ResultsController<S> {
    /// Creates a controller for `specs` with no global sort keys.
    pub fn new(store: Rc<RefCell<S>>, specs: Vec<QuerySpec>) -> Self {
        ControllerBuilder::new().queries(specs).build(store)
    }

    /// Runs every query and replaces the results with a fresh merge.
    ///
    /// Fails with `InvalidSortDescriptors` when neither the global keys nor
    /// any query declares a sort key, and with `StoreUnavailable` when the
    /// store cannot be read. On failure the previous results are kept.
    pub fn fetch(&mut self) -> Result<()> {
        {
            let mut state = self
                .state
                .try_borrow_mut()
                .map_err(|_| Error::invalid_operation("controller is delivering changes"))?;
            if state.destroyed {
                return Err(Error::invalid_operation("controller is closed"));
            }

            let order = CombinedOrder::new(&state.specs, &state.global_sort_keys)?;
            let store = self
                .store
                .try_borrow()
                .map_err(|_| Error::store_unavailable("store is being mutated"))?;
            let entries = ResultMerger::new(&state.specs, &order).fetch(&*store)?;
            drop(store);

            log::debug!(
                "fetched {} entities from {} queries",
                entries.len(),
                state.specs.len()
            );
            state.results = Some(FetchedResults::from_entries(entries));
            state.order = Some(order);
        }
        self.start_tracking();
        Ok(())
    }

    /// Returns the merged entities, or `None` before the first fetch.
    pub fn fetched_entities(&self) -> Option<Vec<Rc<Entity>>> {
        self.with_results(FetchedResults::entities)
    }

    /// Returns the number of merged entities, 0 before the first fetch.
    pub fn fetched_count(&self) -> usize {
        self.with_results(FetchedResults::len).unwrap_or(0)
    }

    /// Returns the current position of an entity, if it is in the results.
    pub fn position_of(&self, id: &EntityId) -> Option<Position> {
        self.with_results(|results| results.position_of(id)).flatten()
    }

    /// Returns the entity at `position`, if any.
    pub fn entity_at(&self, position: Position) -> Option<Rc<Entity>> {
        self.with_results(|results| results.entity_at(position).cloned())
            .flatten()
    }

    /// Runs `f` on the fetched results.
    ///
    /// Returns `None` before the first fetch, and while the controller is
    /// busy delivering changes.
    pub fn with_results<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&FetchedResults) -> R,
    {
        let state = self.state.try_borrow().ok()?;
        state.results.as_ref().map(f)
    }

    /// The queries, in the order given at construction.
    pub fn query_specs(&self) -> Rc<[QuerySpec]> {
        self.state.borrow().specs.clone()
    }

    /// The effective sort keys, available after a successful fetch.
    pub fn sort_keys(&self) -> Option<Vec<SortKey>> {
        let state = self.state.borrow();
        state.order.as_ref().map(|order| order.keys().to_vec())
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.state.borrow().tracking_state()
    }

    /// Sets or clears the observer.
    ///
    /// An observer with at least one callback starts tracking once results
    /// are fetched. Clearing it, or setting one without callbacks, stops
    /// tracking.
    pub fn set_observer(&mut self, observer: Option<ResultsObserver>) {
        let tracks = observer.as_ref().is_some_and(ResultsObserver::tracks_changes);
        match self.state.try_borrow_mut() {
            Ok(mut state) => {
                if state.destroyed {
                    log::warn!("ignoring observer for a closed controller");
                    return;
                }
                state.observer = observer;
            }
            Err(_) => {
                log::warn!("cannot replace the observer while it is being notified");
                return;
            }
        }

        if tracks {
            self.start_tracking();
        } else {
            self.stop_tracking();
        }
    }

    /// Stops tracking and releases the results. Later fetches fail.
    ///
    /// Has no effect while the controller is notifying its observer.
    pub fn close(&mut self) {
        self.stop_tracking();
        match self.state.try_borrow_mut() {
            Ok(mut state) => {
                state.destroyed = true;
                state.observer = None;
                state.results = None;
            }
            Err(_) => log::warn!("cannot close the controller while it is notifying an observer"),
        }
    }

    fn start_tracking(&self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        let wants = state
            .observer
            .as_ref()
            .is_some_and(ResultsObserver::tracks_changes);
        if state.destroyed || state.subscription.is_some() || state.results.is_none() || !wants {
            return;
        }

        let weak: Weak<RefCell<ControllerState>> = Rc::downgrade(&self.state);
        let handler: NotificationHandler = Box::new(move |event: &StoreEvent| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            match state.try_borrow_mut() {
                Ok(mut state) => state.on_store_event(event),
                Err(_) => log::warn!("controller busy; dropping store event"),
            };
        });

        let kinds = state.kinds();
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                let id = store.subscribe(kinds, handler);
                log::debug!("tracking changes with subscription {}", id);
                state.subscription = Some(id);
            }
            Err(_) => log::warn!("store is busy; change tracking not started"),
        }
    }

    fn stop_tracking(&self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        let Some(id) = state.subscription.take() else {
            return;
        };
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                store.unsubscribe(id);
                log::debug!("stopped tracking subscription {}", id);
            }
            // the handler finds no subscription and ignores further events
            Err(_) => log::warn!("store is busy; subscription {} left inert", id),
        }
    }
}

impl<S: StoreAdapter> Drop for ResultsController<S> {
    fn drop(&mut self) {
        self.close();
    }
}
