//! Sort key definitions.

use alloc::string::String;
use core::cmp::Ordering;
use multifetch_core::Entity;

/// Sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Applies this order to an ascending comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// One `(field, direction)` sort descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    field: String,
    order: SortOrder,
}

impl SortKey {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Desc)
    }

    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Compares two entities on this key.
    ///
    /// An entity lacking the field sorts before one that has it (ascending).
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        let cmp = match (a.get(&self.field), b.get(&self.field)) {
            (Some(av), Some(bv)) => av.cmp(bv),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        self.order.apply(cmp)
    }
}
