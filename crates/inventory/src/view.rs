//! Enriched inventory view: ownership joined with catalog metadata.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trove_catalog::CatalogItem;
use trove_core::{CatalogItemId, InventoryRecordId};

use crate::record::InventoryRecord;

/// One owned item as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemView {
    pub catalog_item_id: CatalogItemId,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub acquired_date: DateTime<Utc>,
}

impl InventoryItemView {
    pub fn new(record: &InventoryRecord, item: &CatalogItem) -> Self {
        Self {
            catalog_item_id: record.catalog_item_id,
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: record.quantity,
            acquired_date: record.acquired_date,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("inventory record {record_id} references missing catalog item {catalog_item_id}")]
    DanglingReference {
        record_id: InventoryRecordId,
        catalog_item_id: CatalogItemId,
    },
}

/// Join records against the catalog items fetched for them.
///
/// Strict: the first record whose item is absent from `catalog` fails the
/// whole join. Output order follows `records`.
pub fn join_with_catalog(
    records: &[InventoryRecord],
    catalog: &[CatalogItem],
) -> Result<Vec<InventoryItemView>, JoinError> {
    let by_id: HashMap<CatalogItemId, &CatalogItem> =
        catalog.iter().map(|item| (item.id, item)).collect();

    records
        .iter()
        .map(|record| {
            by_id
                .get(&record.catalog_item_id)
                .map(|item| InventoryItemView::new(record, item))
                .ok_or(JoinError::DanglingReference {
                    record_id: record.id,
                    catalog_item_id: record.catalog_item_id,
                })
        })
        .collect()
}
