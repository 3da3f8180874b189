//! Multifetch Core - entity, value and error types.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - `Value`: Runtime values held by entity fields
//! - `DataType`: The type of a non-null `Value`
//! - `EntityKind` / `EntityId`: Opaque entity identity (kind + store-native key)
//! - `Entity`: An immutable-by-convention snapshot of an entity's fields
//! - `Error`: Error types for queries, stores and controllers
//!
//! # Example
//!
//! ```rust
//! use multifetch_core::{Entity, EntityId, Value};
//!
//! let person = Entity::new(EntityId::new("people", 1))
//!     .with("name", "Alice")
//!     .with("sortOrder", 3i64);
//!
//! assert_eq!(person.id().key(), 1);
//! assert_eq!(person.get("sortOrder"), Some(&Value::Int64(3)));
//! ```

#![no_std]

extern crate alloc;

mod entity;
mod error;
mod types;
mod value;

pub use entity::{Entity, EntityId, EntityKind};
pub use error::{Error, Result};
pub use types::DataType;
pub use value::Value;
