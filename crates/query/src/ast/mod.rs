//! AST module for predicates and sort keys.

mod predicate;
mod sort;

pub use predicate::{CompareOp, CustomPredicate, Predicate, PredicateFn};
pub use sort::{SortKey, SortOrder};
