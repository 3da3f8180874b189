//! Error types for multifetch.

use crate::entity::{EntityId, EntityKind};
use crate::types::DataType;
use alloc::string::String;
use core::fmt;

/// Result type alias for multifetch operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by queries, stores and the results controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No sort key was given, so the merged order would be nondeterministic.
    InvalidSortDescriptors,
    /// A predicate referenced a field the entity does not have.
    FieldNotFound {
        kind: EntityKind,
        field: String,
    },
    /// A predicate compared a field with a value of an incompatible type.
    TypeMismatch {
        field: String,
        expected: DataType,
        got: DataType,
    },
    /// An entity with the same identity already exists in the store.
    DuplicateEntity {
        id: EntityId,
    },
    /// The store has no entity with this identity.
    EntityNotFound {
        id: EntityId,
    },
    /// The store could not be reached (e.g. it is busy delivering a notification).
    StoreUnavailable {
        message: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSortDescriptors => {
                write!(f, "Invalid sort descriptors: at least one sort key is required")
            }
            Error::FieldNotFound { kind, field } => {
                write!(f, "Field {} not found on entity kind {}", field, kind)
            }
            Error::TypeMismatch {
                field,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Type mismatch on field {}: expected {}, got {}",
                    field, expected, got
                )
            }
            Error::DuplicateEntity { id } => write!(f, "Entity already exists: {}", id),
            Error::EntityNotFound { id } => write!(f, "Entity not found: {}", id),
            Error::StoreUnavailable { message } => write!(f, "Store unavailable: {}", message),
            Error::InvalidOperation { message } => write!(f, "Invalid operation: {}", message),
        }
    }
}

impl Error {
    pub fn field_not_found(kind: EntityKind, field: impl Into<String>) -> Self {
        Error::FieldNotFound {
            kind,
            field: field.into(),
        }
    }

    pub fn type_mismatch(field: impl Into<String>, expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            expected,
            got,
        }
    }

    pub fn duplicate_entity(id: EntityId) -> Self {
        Error::DuplicateEntity { id }
    }

    pub fn entity_not_found(id: EntityId) -> Self {
        Error::EntityNotFound { id }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors a predicate raises while evaluating one entity.
    pub fn is_evaluation_fault(&self) -> bool {
        matches!(self, Error::FieldNotFound { .. } | Error::TypeMismatch { .. })
    }
}
