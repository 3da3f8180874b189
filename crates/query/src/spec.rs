//! Query specifications.

use crate::ast::{Predicate, SortKey};
use alloc::vec::Vec;
use multifetch_core::{Entity, EntityKind, Result};

/// One logical query: an entity kind, an optional predicate and sort keys.
///
/// Specifications are immutable once handed to a controller.
#[derive(Clone, Debug)]
pub struct QuerySpec {
    kind: EntityKind,
    predicate: Option<Predicate>,
    sort_keys: Vec<SortKey>,
}

impl QuerySpec {
    /// Creates a specification matching every entity of `kind`.
    pub fn new(kind: impl Into<EntityKind>) -> Self {
        Self {
            kind: kind.into(),
            predicate: None,
            sort_keys: Vec::new(),
        }
    }

    /// Sets the predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Appends a sort key.
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort_keys.push(key);
        self
    }

    #[inline]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    #[inline]
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    #[inline]
    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    /// Returns whether `entity` belongs to this query's result set.
    ///
    /// Entities of other kinds never match. Predicate faults are returned.
    pub fn matches(&self, entity: &Entity) -> Result<bool> {
        if entity.kind() != &self.kind {
            return Ok(false);
        }
        match &self.predicate {
            Some(predicate) => predicate.eval(entity),
            None => Ok(true),
        }
    }
}
