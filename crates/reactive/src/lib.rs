//! Multifetch Reactive - several queries, one sorted and live result set.
//!
//! A `ResultsController` runs a list of query specifications against a
//! shared store, merges their matches into one sequence ordered by a
//! combined sort order, and, while an observer is set, folds every saved
//! store change into that sequence and reports it as ordered change
//! records.
//!
//! # Core Concepts
//!
//! - `ResultsController`: Owns the queries, the fetched results and the
//!   store subscription
//! - `FetchedResults`: The merged sequence plus an identity to row index
//! - `DiffEngine`: Classifies each store change as insert, delete, move or
//!   update and patches the sequence in place
//! - `ChangeSet` / `ChangeRecord`: The ordered records an observer receives
//! - `ResultsObserver`: Optional will-change, per-record and did-change
//!   callbacks
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use multifetch_core::{Entity, EntityId};
//! use multifetch_query::{QuerySpec, SortKey};
//! use multifetch_reactive::{ChangeKind, ResultsController, ResultsObserver};
//! use multifetch_storage::MemoryStore;
//!
//! let store = Rc::new(RefCell::new(MemoryStore::new()));
//! for (key, rank) in [(1, 1i64), (2, 3), (3, 10)] {
//!     store
//!         .borrow_mut()
//!         .insert(Entity::new(EntityId::new("people", key)).with("rank", rank))
//!         .unwrap();
//! }
//! store.borrow_mut().save();
//!
//! let mut controller = ResultsController::new(
//!     store.clone(),
//!     vec![QuerySpec::new("people").sort_by(SortKey::asc("rank"))],
//! );
//! controller.fetch().unwrap();
//!
//! let inserted = Rc::new(RefCell::new(Vec::new()));
//! let sink = inserted.clone();
//! controller.set_observer(Some(ResultsObserver::new().on_did_change_object(
//!     move |_, record| {
//!         if record.kind() == ChangeKind::Insert {
//!             sink.borrow_mut().push(record.new_position().unwrap().row);
//!         }
//!     },
//! )));
//!
//! store
//!     .borrow_mut()
//!     .insert(Entity::new(EntityId::new("people", 4)).with("rank", 5i64))
//!     .unwrap();
//! store.borrow_mut().save();
//! assert_eq!(*inserted.borrow(), vec![2]);
//! ```

#![no_std]

extern crate alloc;

pub mod change_set;
pub mod controller;
pub mod diff;
pub mod merger;
pub mod observer;
pub mod position;
pub mod results;

pub use change_set::{ChangeKind, ChangeRecord, ChangeSet, Position};
pub use controller::{ControllerBuilder, ResultsController, TrackingState};
pub use diff::DiffEngine;
pub use merger::ResultMerger;
pub use observer::{ContentCallback, ObjectCallback, ResultsObserver};
pub use position::PositionIndex;
pub use results::FetchedResults;
