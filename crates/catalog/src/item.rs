use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trove_core::record::ID_FIELD;
use trove_core::{CatalogItemId, DomainError, DomainResult, Entity, FieldValue, Predicate, Record};

/// Catalog item definition.
///
/// Read-only from the reconciler's point of view; only catalog administration
/// creates or edits these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub description: String,
    /// Price in smallest currency unit.
    pub price: u64,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

/// Command: create a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub name: String,
    pub description: String,
    pub price: u64,
}

/// Command: replace the mutable fields of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCatalogItem {
    pub name: String,
    pub description: String,
    pub price: u64,
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

impl CatalogItem {
    /// Build a new, not-yet-stored catalog item with a fresh identifier.
    pub fn create(cmd: NewCatalogItem, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_name(&cmd.name)?;
        Ok(Self {
            id: CatalogItemId::new(),
            name: cmd.name.trim().to_string(),
            description: cmd.description,
            price: cmd.price,
            created_date: now,
            version: 0,
        })
    }

    /// Apply an edit. Identifier and creation date never change.
    pub fn apply_update(&mut self, cmd: UpdateCatalogItem) -> DomainResult<()> {
        validate_name(&cmd.name)?;
        self.name = cmd.name.trim().to_string();
        self.description = cmd.description;
        self.price = cmd.price;
        Ok(())
    }

    /// Predicate selecting the catalog items whose id is in `ids`.
    pub fn with_ids<I>(ids: I) -> Predicate
    where
        I: IntoIterator<Item = CatalogItemId>,
    {
        Predicate::is_in(ID_FIELD, ids.into_iter().map(|id| *id.as_uuid()))
    }

    pub fn with_id(id: CatalogItemId) -> Predicate {
        Predicate::eq(ID_FIELD, *id.as_uuid())
    }
}

impl Entity for CatalogItem {
    type Id = CatalogItemId;

    fn id(&self) -> CatalogItemId {
        self.id
    }
}

impl Record for CatalogItem {
    const COLLECTION: &'static str = "catalog_items";

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            ID_FIELD => Some(FieldValue::Uuid(*self.id.as_uuid())),
            "name" => Some(FieldValue::Text(self.name.clone())),
            _ => None,
        }
    }
}

/// The starter catalog a fresh deployment is seeded with.
pub fn default_items() -> Vec<NewCatalogItem> {
    vec![
        NewCatalogItem {
            name: "Potion".to_string(),
            description: "Restores a small amount of HP".to_string(),
            price: 500,
        },
        NewCatalogItem {
            name: "Antidote".to_string(),
            description: "Cures poison".to_string(),
            price: 700,
        },
        NewCatalogItem {
            name: "Bronze sword".to_string(),
            description: "Deals a small amount of damage".to_string(),
            price: 2000,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potion() -> NewCatalogItem {
        NewCatalogItem {
            name: "Potion".to_string(),
            description: "Restores a small amount of HP".to_string(),
            price: 500,
        }
    }

    #[test]
    fn create_assigns_fresh_id_and_timestamp() {
        let now = Utc::now();
        let a = CatalogItem::create(potion(), now).unwrap();
        let b = CatalogItem::create(potion(), now).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_date, now);
        assert_eq!(a.version, 0);
        assert_eq!(a.name, "Potion");
    }

    #[test]
    fn create_rejects_blank_name() {
        let cmd = NewCatalogItem {
            name: "   ".to_string(),
            ..potion()
        };
        let err = CatalogItem::create(cmd, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_keeps_identity_and_creation_date() {
        let mut item = CatalogItem::create(potion(), Utc::now()).unwrap();
        let (id, created) = (item.id, item.created_date);

        item.apply_update(UpdateCatalogItem {
            name: "Hi-Potion".to_string(),
            description: "Restores a lot of HP".to_string(),
            price: 1500,
        })
        .unwrap();

        assert_eq!(item.id, id);
        assert_eq!(item.created_date, created);
        assert_eq!(item.name, "Hi-Potion");
        assert_eq!(item.price, 1500);
    }

    #[test]
    fn with_ids_selects_only_listed_items() {
        let a = CatalogItem::create(potion(), Utc::now()).unwrap();
        let b = CatalogItem::create(potion(), Utc::now()).unwrap();
        let pred = CatalogItem::with_ids([a.id]);
        assert!(pred.matches(&a));
        assert!(!pred.matches(&b));
    }

    #[test]
    fn version_is_optional_on_the_wire() {
        let json = serde_json::json!({
            "id": CatalogItemId::new(),
            "name": "Antidote",
            "description": "Cures poison",
            "price": 700,
            "created_date": Utc::now(),
        });
        let item: CatalogItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.version, 0);
    }

    #[test]
    fn default_catalog_has_three_named_items() {
        let names: Vec<_> = default_items().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Potion", "Antidote", "Bronze sword"]);
    }
}
