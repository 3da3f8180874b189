//! Predicate definitions for query filtering.
//!
//! A `Predicate` is a small tagged expression tree evaluated against one
//! entity at a time. Evaluation can fault: a referenced field may be missing
//! on the entity (common when a predicate meets an entity of another kind)
//! or hold a value that cannot be compared with the literal. Faults are
//! returned as errors so callers decide whether they are fatal.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use multifetch_core::{DataType, Entity, Error, Result, Value};

/// Comparison operator of a `Predicate::Compare`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Signature of a predicate supplied as a closure.
pub type PredicateFn = dyn Fn(&Entity) -> Result<bool>;

/// A named closure predicate.
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    func: Rc<PredicateFn>,
}

impl CustomPredicate {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A predicate evaluated against entities.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// Matches every entity.
    True,
    /// Matches no entity.
    False,
    /// `field <op> value`.
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// `low <= field <= high`.
    Between {
        field: String,
        low: Value,
        high: Value,
    },
    /// `field` equals one of `values`.
    In { field: String, values: Vec<Value> },
    /// `field` is present and Null.
    IsNull(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Predicate::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull(field.into())
    }

    /// Wraps a closure as a predicate.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Entity) -> Result<bool> + 'static,
    {
        Predicate::Custom(CustomPredicate {
            name: name.into(),
            func: Rc::new(func),
        })
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(alloc::vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut parts) => {
                parts.push(other);
                Predicate::Or(parts)
            }
            first => Predicate::Or(alloc::vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates the predicate against an entity.
    ///
    /// `And`/`Or` short-circuit, so a fault in an operand that is never
    /// reached does not surface.
    pub fn eval(&self, entity: &Entity) -> Result<bool> {
        match self {
            Predicate::True => Ok(true),
            Predicate::False => Ok(false),
            Predicate::Compare { field, op, value } => {
                let actual = lookup(entity, field, value)?;
                Ok(compare_values(actual, *op, value))
            }
            Predicate::Between { field, low, high } => {
                let actual = lookup(entity, field, low)?;
                check_comparable(field, actual, high)?;
                Ok(compare_values(actual, CompareOp::Ge, low)
                    && compare_values(actual, CompareOp::Le, high))
            }
            Predicate::In { field, values } => {
                let actual = field_value(entity, field)?;
                for candidate in values {
                    check_comparable(field, actual, candidate)?;
                }
                Ok(values
                    .iter()
                    .any(|candidate| compare_values(actual, CompareOp::Eq, candidate)))
            }
            Predicate::IsNull(field) => Ok(field_value(entity, field)?.is_null()),
            Predicate::And(parts) => {
                for part in parts {
                    if !part.eval(entity)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if part.eval(entity)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.eval(entity)?),
            Predicate::Custom(custom) => (custom.func)(entity),
        }
    }
}

fn field_value<'a>(entity: &'a Entity, field: &str) -> Result<&'a Value> {
    entity
        .get(field)
        .ok_or_else(|| Error::field_not_found(entity.kind().clone(), field))
}

fn lookup<'a>(entity: &'a Entity, field: &str, literal: &Value) -> Result<&'a Value> {
    let actual = field_value(entity, field)?;
    check_comparable(field, actual, literal)?;
    Ok(actual)
}

fn check_comparable(field: &str, actual: &Value, literal: &Value) -> Result<()> {
    if actual.is_comparable_with(literal) {
        return Ok(());
    }
    // both sides are non-null here
    let expected = literal.data_type().unwrap_or(DataType::Boolean);
    let got = actual.data_type().unwrap_or(DataType::Boolean);
    Err(Error::type_mismatch(field, expected, got))
}

/// Compares two values. Null only takes part in Eq/Ne.
fn compare_values(actual: &Value, op: CompareOp, literal: &Value) -> bool {
    if actual.is_null() || literal.is_null() {
        let both = actual.is_null() && literal.is_null();
        return match op {
            CompareOp::Eq => both,
            CompareOp::Ne => !both,
            _ => false,
        };
    }

    // numeric values compare by magnitude regardless of Int64/Float64
    let ord = match (actual.as_f64(), literal.as_f64()) {
        (Some(a), Some(b)) if actual.data_type() != literal.data_type() => {
            a.partial_cmp(&b)
        }
        _ => Some(actual.cmp(literal)),
    };
    let Some(ord) = ord else {
        return op == CompareOp::Ne;
    };

    match op {
        CompareOp::Eq => ord.is_eq(),
        CompareOp::Ne => ord.is_ne(),
        CompareOp::Lt => ord.is_lt(),
        CompareOp::Le => ord.is_le(),
        CompareOp::Gt => ord.is_gt(),
        CompareOp::Ge => ord.is_ge(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use multifetch_core::EntityId;

    fn person(key: u64, age: i64, name: &str) -> Entity {
        Entity::new(EntityId::new("people", key))
            .with("age", age)
            .with("name", name)
            .with("nickname", Value::Null)
    }

    #[test]
    fn test_compare_ops() {
        let p = person(1, 30, "Alice");
        assert!(Predicate::eq("age", 30i64).eval(&p).unwrap());
        assert!(Predicate::ne("age", 31i64).eval(&p).unwrap());
        assert!(Predicate::lt("age", 31i64).eval(&p).unwrap());
        assert!(Predicate::le("age", 30i64).eval(&p).unwrap());
        assert!(!Predicate::gt("age", 30i64).eval(&p).unwrap());
        assert!(Predicate::ge("age", 30i64).eval(&p).unwrap());
        assert!(Predicate::eq("name", "Alice").eval(&p).unwrap());
    }

    #[test]
    fn test_numeric_families_compare() {
        let p = person(1, 30, "Alice");
        assert!(Predicate::eq("age", 30.0).eval(&p).unwrap());
        assert!(Predicate::lt("age", 30.5).eval(&p).unwrap());
    }

    #[test]
    fn test_null_semantics() {
        let p = person(1, 30, "Alice");
        assert!(Predicate::is_null("nickname").eval(&p).unwrap());
        assert!(!Predicate::is_null("name").eval(&p).unwrap());
        assert!(Predicate::eq("nickname", Value::Null).eval(&p).unwrap());
        assert!(!Predicate::lt("nickname", "Bob").eval(&p).unwrap());
        assert!(Predicate::ne("nickname", "Bob").eval(&p).unwrap());
    }

    #[test]
    fn test_missing_field_faults() {
        let p = person(1, 30, "Alice");
        let err = Predicate::gt("sortOrder", 1i64).eval(&p).unwrap_err();
        assert!(matches!(err, Error::FieldNotFound { .. }));
        assert!(err.is_evaluation_fault());
    }

    #[test]
    fn test_type_mismatch_faults() {
        let p = person(1, 30, "Alice");
        let err = Predicate::eq("name", 3i64).eval(&p).unwrap_err();
        match err {
            Error::TypeMismatch { field, expected, got } => {
                assert_eq!(field, "name");
                assert_eq!(expected, DataType::Int64);
                assert_eq!(got, DataType::String);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_between_and_in() {
        let p = person(1, 30, "Alice");
        assert!(Predicate::between("age", 18i64, 30i64).eval(&p).unwrap());
        assert!(!Predicate::between("age", 31i64, 40i64).eval(&p).unwrap());
        assert!(Predicate::in_list("name", vec!["Bob".into(), "Alice".into()])
            .eval(&p)
            .unwrap());
        assert!(Predicate::in_list("age", vec![Value::Int64(1), Value::Int64(2)])
            .eval(&p)
            .is_ok_and(|m| !m));
    }

    #[test]
    fn test_logical_combinators() {
        let p = person(1, 30, "Alice");
        let adult_alice = Predicate::ge("age", 18i64).and(Predicate::eq("name", "Alice"));
        assert!(adult_alice.eval(&p).unwrap());
        assert!(!adult_alice.clone().not().eval(&p).unwrap());

        let either = Predicate::eq("name", "Bob").or(Predicate::lt("age", 40i64));
        assert!(either.eval(&p).unwrap());
    }

    #[test]
    fn test_short_circuit_skips_faulting_operand() {
        let p = person(1, 30, "Alice");
        let guarded = Predicate::False.and(Predicate::eq("missing", 1i64));
        assert_eq!(guarded.eval(&p), Ok(false));

        let unguarded = Predicate::True.and(Predicate::eq("missing", 1i64));
        assert!(unguarded.eval(&p).is_err());
    }

    #[test]
    fn test_custom_predicate() {
        let p = person(1, 30, "Alice");
        let even_age = Predicate::custom("even age", |e: &Entity| {
            Ok(e.get("age").and_then(Value::as_i64).is_some_and(|a| a % 2 == 0))
        });
        assert!(even_age.eval(&p).unwrap());
        assert!(alloc::format!("{:?}", even_age).contains("even age"));
    }
}
