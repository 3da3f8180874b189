//! Multifetch Query - query specifications and the combined sort order.
//!
//! This crate provides:
//!
//! - `ast`: The `Predicate` expression tree and `SortKey` descriptors
//! - `spec`: `QuerySpec`, one (kind, predicate, sort keys) query
//! - `comparator`: `CombinedOrder`, the total order used to merge several
//!   queries' results, and `MergedEntry`, one element of the merged sequence

#![no_std]

extern crate alloc;

pub mod ast;
pub mod comparator;
pub mod spec;

pub use ast::{CompareOp, Predicate, SortKey, SortOrder};
pub use comparator::{CombinedOrder, MergedEntry};
pub use spec::QuerySpec;
