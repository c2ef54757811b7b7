use serde::Deserialize;
use serde_json::json;

use trove_catalog::{CatalogItem, NewCatalogItem, UpdateCatalogItem};
use trove_core::{CatalogItemId, DomainError, UserId};
use trove_inventory::{GrantItem, InventoryItemView, InventoryRecord};

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /items`.
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantItemsRequest {
    pub user_id: String,
    pub catalog_item_id: String,
    pub quantity: i64,
}

impl GrantItemsRequest {
    pub fn into_command(self) -> Result<GrantItem, DomainError> {
        Ok(GrantItem {
            user_id: self.user_id.parse::<UserId>()?,
            catalog_item_id: self.catalog_item_id.parse::<CatalogItemId>()?,
            quantity: self.quantity,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCatalogItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
}

impl From<CreateCatalogItemRequest> for NewCatalogItem {
    fn from(body: CreateCatalogItemRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            price: body.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCatalogItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
}

impl From<UpdateCatalogItemRequest> for UpdateCatalogItem {
    fn from(body: UpdateCatalogItemRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            price: body.price,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn item_view_to_json(view: &InventoryItemView) -> serde_json::Value {
    json!({
        "catalogItemId": view.catalog_item_id.to_string(),
        "name": view.name,
        "description": view.description,
        "quantity": view.quantity,
        "acquiredDate": view.acquired_date.to_rfc3339(),
    })
}

pub fn inventory_record_to_json(record: &InventoryRecord) -> serde_json::Value {
    json!({
        "id": record.id.to_string(),
        "userId": record.user_id.to_string(),
        "catalogItemId": record.catalog_item_id.to_string(),
        "quantity": record.quantity,
        "acquiredDate": record.acquired_date.to_rfc3339(),
    })
}

pub fn catalog_item_to_json(item: &CatalogItem) -> serde_json::Value {
    json!({
        "id": item.id.to_string(),
        "name": item.name,
        "description": item.description,
        "price": item.price,
        "createdDate": item.created_date.to_rfc3339(),
    })
}
