use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use trove_core::{ExpectedVersion, Predicate, Record};

use super::r#trait::{RecordStore, StoreError};

#[derive(Debug)]
struct Arena<T> {
    records: HashMap<Uuid, T>,
    unique: HashMap<String, Uuid>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            unique: HashMap::new(),
        }
    }
}

/// In-memory arena record store.
///
/// Intended for tests/dev. Every operation takes the lock, does its work
/// synchronously and releases it before returning, so no guard ever lives
/// across an `.await`.
#[derive(Debug)]
pub struct InMemoryRecordStore<T> {
    arena: RwLock<Arena<T>>,
}

impl<T> InMemoryRecordStore<T> {
    pub fn new() -> Self {
        Self {
            arena: RwLock::new(Arena::default()),
        }
    }
}

impl<T> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<T> InMemoryRecordStore<T> {
    pub(crate) fn len(&self) -> usize {
        self.arena.read().expect("lock poisoned").records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Record> InMemoryRecordStore<T> {
    fn matching(&self, predicate: &Predicate) -> Result<Vec<T>, StoreError> {
        let arena = self
            .arena
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(arena
            .records
            .values()
            .filter(|r| predicate.matches(*r))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl<T: Record> RecordStore<T> for InMemoryRecordStore<T> {
    async fn get_all(&self, predicate: &Predicate) -> Result<Vec<T>, StoreError> {
        self.matching(predicate)
    }

    async fn get_one(&self, predicate: &Predicate) -> Result<Option<T>, StoreError> {
        let mut found = self.matching(predicate)?;
        if found.len() > 1 {
            return Err(StoreError::Ambiguous {
                collection: T::COLLECTION,
            });
        }
        Ok(found.pop())
    }

    async fn create(&self, mut record: T) -> Result<T, StoreError> {
        let id: Uuid = record.id().into();
        let key = record.unique_key();

        let mut arena = self
            .arena
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        if arena.records.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("{}: id {id}", T::COLLECTION)));
        }
        if let Some(key) = &key {
            if arena.unique.contains_key(key) {
                return Err(StoreError::Duplicate(format!("{}: key {key}", T::COLLECTION)));
            }
        }

        record.set_version(1);
        if let Some(key) = key {
            arena.unique.insert(key, id);
        }
        arena.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: T, expected: ExpectedVersion) -> Result<T, StoreError> {
        let id: Uuid = record.id().into();
        let new_key = record.unique_key();

        let mut arena = self
            .arena
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let (current_version, old_key) = match arena.records.get(&id) {
            Some(current) => (current.version(), current.unique_key()),
            None => return Err(StoreError::NotFound(format!("{}: id {id}", T::COLLECTION))),
        };

        if !expected.matches(current_version) {
            return Err(StoreError::Concurrency(format!(
                "{}: expected {expected:?}, found {current_version}",
                T::COLLECTION
            )));
        }

        if new_key != old_key {
            if let Some(key) = &new_key {
                if arena.unique.get(key).is_some_and(|owner| *owner != id) {
                    return Err(StoreError::Duplicate(format!("{}: key {key}", T::COLLECTION)));
                }
            }
            if let Some(old) = old_key {
                arena.unique.remove(&old);
            }
            if let Some(key) = new_key {
                arena.unique.insert(key, id);
            }
        }

        record.set_version(current_version + 1);
        arena.records.insert(id, record.clone());
        Ok(record)
    }
}
