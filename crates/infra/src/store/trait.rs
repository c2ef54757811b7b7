use std::sync::Arc;

use thiserror::Error;

use trove_core::{ExpectedVersion, Predicate, Record};

/// Record store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
///
/// `Concurrency` and `Duplicate` are the two signals a read-modify-write caller
/// may retry on; everything else should surface unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("predicate matched more than one record in '{collection}'")]
    Ambiguous { collection: &'static str },

    #[error("record serialization failed: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the error signals a lost race with a concurrent writer.
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, StoreError::Concurrency(_) | StoreError::Duplicate(_))
    }
}

/// Keyed record store, generic over the record type.
///
/// ## Semantics
///
/// - `get_all`: every record matching the predicate, order unspecified
/// - `get_one`: at most one match; more than one is `Ambiguous`
/// - `create`: persists a new record and stamps version 1. A taken id or
///   unique key is `Duplicate`
/// - `update`: replaces the record with the same id and bumps its version.
///   Unknown id is `NotFound`, a failed expectation is `Concurrency`; in both
///   cases nothing is written
///
/// Every call is a suspension point. Implementations must not hold an
/// in-process lock across an `.await`.
#[async_trait::async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    async fn get_all(&self, predicate: &Predicate) -> Result<Vec<T>, StoreError>;

    async fn get_one(&self, predicate: &Predicate) -> Result<Option<T>, StoreError>;

    async fn create(&self, record: T) -> Result<T, StoreError>;

    async fn update(&self, record: T, expected: ExpectedVersion) -> Result<T, StoreError>;
}

/// Type-erased store handle, used where the backend is picked at runtime.
pub type SharedStore<T> = Arc<dyn RecordStore<T>>;

#[async_trait::async_trait]
impl<T, S> RecordStore<T> for Arc<S>
where
    T: Record,
    S: RecordStore<T> + ?Sized,
{
    async fn get_all(&self, predicate: &Predicate) -> Result<Vec<T>, StoreError> {
        (**self).get_all(predicate).await
    }

    async fn get_one(&self, predicate: &Predicate) -> Result<Option<T>, StoreError> {
        (**self).get_one(predicate).await
    }

    async fn create(&self, record: T) -> Result<T, StoreError> {
        (**self).create(record).await
    }

    async fn update(&self, record: T, expected: ExpectedVersion) -> Result<T, StoreError> {
        (**self).update(record, expected).await
    }
}
