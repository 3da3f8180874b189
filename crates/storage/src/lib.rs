//! Multifetch Storage - the store side of a results controller.
//!
//! This crate provides:
//!
//! - `StoreAdapter`: The contract a store fulfils for a controller (run a
//!   query, subscribe to saved changes, unsubscribe)
//! - `ChangeNotification` / `StoreEvent`: What subscribers receive
//! - `ChangeJournal`: Coalesces the mutations of one unit of work
//! - `MemoryStore`: An in-memory reference store
//!
//! # Example
//!
//! ```rust
//! use multifetch_core::{Entity, EntityId};
//! use multifetch_query::{Predicate, QuerySpec};
//! use multifetch_storage::{MemoryStore, StoreAdapter};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .insert(Entity::new(EntityId::new("people", 1)).with("age", 30i64))
//!     .unwrap();
//! store.save();
//!
//! let adults = QuerySpec::new("people").filter(Predicate::ge("age", 18i64));
//! assert_eq!(store.execute_query(&adults).unwrap().len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod adapter;
pub mod journal;
pub mod memory;
pub mod notification;

pub use adapter::StoreAdapter;
pub use journal::ChangeJournal;
pub use memory::MemoryStore;
pub use notification::{ChangeNotification, NotificationHandler, StoreEvent, SubscriptionId};
