//! Storable records and the predicate language used to query them.
//!
//! Stores are generic over the record type. A query is expressed as a
//! [`Predicate`] value (not a closure) so every backend can evaluate it: the
//! in-memory arena walks [`Record::field`], the SQL backend compiles it into a
//! `WHERE` clause over the serialized document.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::entity::Entity;

/// Name of the identifier field every record exposes through [`Record::field`].
pub const ID_FIELD: &str = "id";

/// A scalar value a predicate can compare a record field against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Uuid(Uuid),
    Text(String),
    Int(i64),
}

impl FieldValue {
    /// Canonical text form, identical to the JSON text of the serialized field.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Uuid(u) => u.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
        }
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// Boolean filter over field equality and set membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// `field == value`
    Eq(&'static str, FieldValue),
    /// `field ∈ values` (an empty set matches nothing)
    In(&'static str, Vec<FieldValue>),
    /// Conjunction; an empty conjunction matches everything.
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: &'static str, value: impl Into<FieldValue>) -> Self {
        Predicate::Eq(field, value.into())
    }

    pub fn is_in<V, I>(field: &'static str, values: I) -> Self
    where
        V: Into<FieldValue>,
        I: IntoIterator<Item = V>,
    {
        Predicate::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Evaluate against a record in memory.
    ///
    /// Unknown fields never match.
    pub fn matches<T: Record>(&self, record: &T) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq(field, value) => record.field(field).as_ref() == Some(value),
            Predicate::In(field, values) => match record.field(field) {
                Some(v) => values.contains(&v),
                None => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }
}

/// A record that can live in a generic record store.
///
/// `version` is owned by the store: `create` stamps 1, every successful
/// `update` bumps it, and callers pass the version they read back as the
/// optimistic concurrency expectation.
pub trait Record: Entity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical collection (table) name. Must be a plain SQL identifier.
    const COLLECTION: &'static str;

    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);

    /// Value of a queryable field, or `None` if the field does not exist.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Secondary key the store must keep unique across the collection.
    fn unique_key(&self) -> Option<String> {
        None
    }
}
