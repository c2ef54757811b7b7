//! Inventory reconciler: grant-and-list orchestration over two record stores.
//!
//! ```text
//! grant_item(cmd)
//!   ↓
//! 1. Validate (no store access on failure)
//!   ↓
//! 2. get_one(user, item) ──none──► create(first grant)
//!   │ some
//!   ↓
//! 3. accumulate quantity ──► update(expected = version read in 2)
//!   ↓
//! Concurrency / Duplicate ──► back to 2 (bounded)
//! ```
//!
//! `list_user_items` reads the user's records, fetches the referenced catalog
//! items in one bulk lookup and joins them strictly.

use std::collections::BTreeSet;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use trove_catalog::CatalogItem;
use trove_core::{CatalogItemId, DomainError, ExpectedVersion, InventoryRecordId, UserId};
use trove_inventory::{GrantItem, InventoryItemView, InventoryRecord, JoinError, join_with_catalog};

use crate::store::{RecordStore, StoreError};

/// Default bound on read-modify-write attempts per grant.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Caller error, detected before any store access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Domain invariant failure (e.g. quantity overflow).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An owned record points at a catalog item that cannot be found.
    #[error("inventory record {record_id} references missing catalog item {catalog_item_id}")]
    DanglingReference {
        record_id: InventoryRecordId,
        catalog_item_id: CatalogItemId,
    },

    /// Every attempt lost a race with a concurrent writer.
    #[error("grant abandoned after {attempts} attempts due to concurrent writers")]
    Contention { attempts: u32 },

    /// Underlying store failure, propagated unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for ReconcileError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ReconcileError::Validation(msg),
            DomainError::InvariantViolation(msg) => ReconcileError::InvariantViolation(msg),
        }
    }
}

impl From<JoinError> for ReconcileError {
    fn from(value: JoinError) -> Self {
        match value {
            JoinError::DanglingReference {
                record_id,
                catalog_item_id,
            } => ReconcileError::DanglingReference {
                record_id,
                catalog_item_id,
            },
        }
    }
}

/// Grants items to users and lists their enriched inventory.
///
/// ## Generic Parameters
///
/// - `I`: inventory store (owned exclusively by the reconciler)
/// - `C`: catalog store (read-only here)
///
/// The reconciler is stateless per request and safe to share across tasks.
#[derive(Debug)]
pub struct InventoryReconciler<I, C> {
    inventory: I,
    catalog: C,
    max_attempts: u32,
}

impl<I, C> InventoryReconciler<I, C> {
    pub fn new(inventory: I, catalog: C) -> Self {
        Self {
            inventory,
            catalog,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Bound the optimistic retry loop (at least one attempt is always made).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl<I, C> InventoryReconciler<I, C>
where
    I: RecordStore<InventoryRecord>,
    C: RecordStore<CatalogItem>,
{
    /// Add `quantity` of an item to a user's inventory.
    ///
    /// Creates the record on first grant; later grants add to its quantity.
    /// Returns the record as stored.
    #[instrument(
        skip(self, cmd),
        fields(
            user_id = %cmd.user_id,
            catalog_item_id = %cmd.catalog_item_id,
            quantity = cmd.quantity
        ),
        err
    )]
    pub async fn grant_item(&self, cmd: GrantItem) -> Result<InventoryRecord, ReconcileError> {
        cmd.validate()?;

        for attempt in 1..=self.max_attempts {
            match self.try_grant(&cmd).await {
                Ok(record) => return Ok(record),
                Err(ReconcileError::Store(e)) if e.is_write_conflict() => {
                    debug!(attempt, error = %e, "grant raced with a concurrent writer; retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts = self.max_attempts, "grant gave up under contention");
        Err(ReconcileError::Contention {
            attempts: self.max_attempts,
        })
    }

    async fn try_grant(&self, cmd: &GrantItem) -> Result<InventoryRecord, ReconcileError> {
        let existing = self
            .inventory
            .get_one(&InventoryRecord::for_pair(cmd.user_id, cmd.catalog_item_id))
            .await?;

        match existing {
            None => {
                let record = InventoryRecord::first_grant(cmd, Utc::now())?;
                Ok(self.inventory.create(record).await?)
            }
            Some(mut record) => {
                let expected = ExpectedVersion::Exact(record.version);
                record.accumulate(cmd)?;
                Ok(self.inventory.update(record, expected).await?)
            }
        }
    }

    /// List a user's items joined with their catalog metadata.
    ///
    /// Entries are ordered by acquisition date. A record whose catalog item is
    /// missing fails the whole call with `DanglingReference`.
    #[instrument(skip_all, fields(user_id = %user_id), err)]
    pub async fn list_user_items(&self, user_id: UserId) -> Result<Vec<InventoryItemView>, ReconcileError> {
        if user_id.is_nil() {
            return Err(ReconcileError::Validation("user_id cannot be empty".to_string()));
        }

        let mut records = self.inventory.get_all(&InventoryRecord::owned_by(user_id)).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        records.sort_by_key(|r| (r.acquired_date, r.id));

        let item_ids: BTreeSet<CatalogItemId> = records.iter().map(|r| r.catalog_item_id).collect();
        let catalog = self.catalog.get_all(&CatalogItem::with_ids(item_ids)).await?;

        join_with_catalog(&records, &catalog).map_err(|e| {
            warn!(error = %e, "inventory references a missing catalog item");
            e.into()
        })
    }
}
