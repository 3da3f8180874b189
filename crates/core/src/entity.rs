//! Entity identity and snapshots.
//!
//! Entities are owned by the store. Everything else holds `Rc<Entity>`
//! snapshots and refers to entities by `EntityId`.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

/// Name of an entity kind, such as `"people"` or `"animal"`.
///
/// Cloning is a reference count bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKind(Rc<str>);

impl EntityKind {
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of an entity: its kind plus the store-native key.
///
/// The derived ordering (kind, then key) is the store-native order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    kind: EntityKind,
    key: u64,
}

impl EntityId {
    pub fn new(kind: impl Into<EntityKind>, key: u64) -> Self {
        Self {
            kind: kind.into(),
            key,
        }
    }

    #[inline]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    #[inline]
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.key)
    }
}

/// A snapshot of an entity's fields.
#[derive(Clone, Debug)]
pub struct Entity {
    id: EntityId,
    /// Bumped by the store on every saved update.
    version: u64,
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no fields. Version defaults to 1.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            version: 1,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    #[inline]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> &EntityKind {
        self.id.kind()
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Gets the value of a field, or None if the entity has no such field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    fn person(key: u64, rank: i64) -> Entity {
        Entity::new(EntityId::new("people", key))
            .with("name", "Alice")
            .with("rank", rank)
    }

    #[test]
    fn test_entity_new() {
        let e = person(1, 10);
        assert_eq!(e.id().key(), 1);
        assert_eq!(e.kind().as_str(), "people");
        assert_eq!(e.version(), 1);
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn test_entity_get_and_set() {
        let mut e = person(1, 10);
        assert_eq!(e.get("rank"), Some(&Value::Int64(10)));
        assert_eq!(e.get("missing"), None);

        let old = e.set("rank", 20i64);
        assert_eq!(old, Some(Value::Int64(10)));
        assert_eq!(e.get("rank"), Some(&Value::Int64(20)));
    }

    #[test]
    fn test_entity_equality_ignores_version() {
        let a = person(1, 10);
        let mut b = person(1, 10);
        b.set_version(7);
        assert_eq!(a, b);
        assert_ne!(a, person(2, 10));
    }

    #[test]
    fn test_store_native_order() {
        let mut ids: Vec<EntityId> = alloc::vec![
            EntityId::new("people", 2),
            EntityId::new("animal", 9),
            EntityId::new("people", 1),
        ];
        ids.sort();
        assert_eq!(ids[0], EntityId::new("animal", 9));
        assert_eq!(ids[1], EntityId::new("people", 1));
        assert_eq!(ids[2], EntityId::new("people", 2));
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::new("animal", 3).to_string(), "animal#3");
    }

    #[test]
    fn test_fields_in_name_order() {
        let e = person(1, 10);
        let names: Vec<&str> = e.fields().map(|(k, _)| k).collect();
        assert_eq!(names, alloc::vec!["name", "rank"]);
    }
}
