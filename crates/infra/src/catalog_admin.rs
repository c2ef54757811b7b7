//! Catalog administration: create, read and edit item definitions.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use trove_catalog::{CatalogItem, NewCatalogItem, UpdateCatalogItem, default_items};
use trove_core::{CatalogItemId, DomainError, ExpectedVersion, Predicate};

use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("catalog item {0} not found")]
    NotFound(CatalogItemId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => CatalogError::Validation(msg),
        }
    }
}

#[derive(Debug)]
pub struct CatalogAdmin<S> {
    store: S,
}

impl<S> CatalogAdmin<S>
where
    S: RecordStore<CatalogItem>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every catalog item, oldest first.
    pub async fn list(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut items = self.store.get_all(&Predicate::All).await?;
        items.sort_by(|a, b| a.created_date.cmp(&b.created_date).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    pub async fn get(&self, id: CatalogItemId) -> Result<CatalogItem, CatalogError> {
        self.store
            .get_one(&CatalogItem::with_id(id))
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    #[instrument(skip(self, cmd), fields(name = %cmd.name), err)]
    pub async fn create(&self, cmd: NewCatalogItem) -> Result<CatalogItem, CatalogError> {
        let item = CatalogItem::create(cmd, Utc::now())?;
        Ok(self.store.create(item).await?)
    }

    /// Replace name, description and price of an existing item.
    #[instrument(skip(self, cmd), fields(id = %id), err)]
    pub async fn update(&self, id: CatalogItemId, cmd: UpdateCatalogItem) -> Result<CatalogItem, CatalogError> {
        let mut item = self.get(id).await?;
        let expected = ExpectedVersion::Exact(item.version);
        item.apply_update(cmd)?;

        self.store.update(item, expected).await.map_err(|e| match e {
            StoreError::NotFound(_) => CatalogError::NotFound(id),
            StoreError::Concurrency(msg) => CatalogError::Conflict(msg),
            other => CatalogError::Store(other),
        })
    }

    /// Insert the starter catalog when the catalog is empty.
    ///
    /// Returns the number of items inserted.
    pub async fn seed_defaults(&self) -> Result<usize, CatalogError> {
        if !self.store.get_all(&Predicate::All).await?.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0;
        for cmd in default_items() {
            self.create(cmd).await?;
            inserted += 1;
        }
        info!(inserted, "seeded default catalog");
        Ok(inserted)
    }
}
