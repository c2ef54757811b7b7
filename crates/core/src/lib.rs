//! `trove-core` - domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, record versioning and the predicate
//! language every record store understands.

pub mod entity;
pub mod error;
pub mod id;
pub mod record;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CatalogItemId, InventoryRecordId, UserId};
pub use record::{FieldValue, Predicate, Record};
pub use version::ExpectedVersion;
