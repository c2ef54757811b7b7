use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trove_core::record::ID_FIELD;
use trove_core::{
    CatalogItemId, DomainError, DomainResult, Entity, FieldValue, InventoryRecordId, Predicate,
    Record, UserId,
};

pub const USER_ID_FIELD: &str = "user_id";
pub const CATALOG_ITEM_ID_FIELD: &str = "catalog_item_id";

/// Ownership fact: `user_id` holds `quantity` of `catalog_item_id`.
///
/// At most one record exists per `(user_id, catalog_item_id)`. The pair is
/// exposed as the record's unique key so stores can enforce it too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryRecordId,
    pub user_id: UserId,
    /// Weak reference into the catalog; may name an item that no longer exists.
    pub catalog_item_id: CatalogItemId,
    pub quantity: i64,
    /// Set once on first grant.
    pub acquired_date: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

/// Command: GrantItem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantItem {
    pub user_id: UserId,
    pub catalog_item_id: CatalogItemId,
    pub quantity: i64,
}

impl GrantItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.user_id.is_nil() {
            return Err(DomainError::validation("user_id cannot be empty"));
        }
        if self.catalog_item_id.is_nil() {
            return Err(DomainError::validation("catalog_item_id cannot be empty"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

impl InventoryRecord {
    /// Record created by the first grant of an item to a user.
    pub fn first_grant(cmd: &GrantItem, now: DateTime<Utc>) -> DomainResult<Self> {
        cmd.validate()?;
        Ok(Self {
            id: InventoryRecordId::new(),
            user_id: cmd.user_id,
            catalog_item_id: cmd.catalog_item_id,
            quantity: cmd.quantity,
            acquired_date: now,
            version: 0,
        })
    }

    /// Fold a later grant into this record.
    ///
    /// Only `quantity` changes.
    pub fn accumulate(&mut self, cmd: &GrantItem) -> DomainResult<()> {
        cmd.validate()?;
        if cmd.user_id != self.user_id || cmd.catalog_item_id != self.catalog_item_id {
            return Err(DomainError::invariant("grant targets a different (user, item) pair"));
        }
        self.quantity = self
            .quantity
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        Ok(())
    }

    pub fn owned_by(user_id: UserId) -> Predicate {
        Predicate::eq(USER_ID_FIELD, *user_id.as_uuid())
    }

    /// Predicate for the single record of a `(user, item)` pair.
    pub fn for_pair(user_id: UserId, catalog_item_id: CatalogItemId) -> Predicate {
        Self::owned_by(user_id).and(Predicate::eq(CATALOG_ITEM_ID_FIELD, *catalog_item_id.as_uuid()))
    }

    pub fn pair_key(user_id: UserId, catalog_item_id: CatalogItemId) -> String {
        format!("{user_id}:{catalog_item_id}")
    }
}

impl Entity for InventoryRecord {
    type Id = InventoryRecordId;

    fn id(&self) -> InventoryRecordId {
        self.id
    }
}

impl Record for InventoryRecord {
    const COLLECTION: &'static str = "inventory_records";

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            ID_FIELD => Some(FieldValue::Uuid(*self.id.as_uuid())),
            USER_ID_FIELD => Some(FieldValue::Uuid(*self.user_id.as_uuid())),
            CATALOG_ITEM_ID_FIELD => Some(FieldValue::Uuid(*self.catalog_item_id.as_uuid())),
            "quantity" => Some(FieldValue::Int(self.quantity)),
            _ => None,
        }
    }

    fn unique_key(&self) -> Option<String> {
        Some(Self::pair_key(self.user_id, self.catalog_item_id))
    }
}
