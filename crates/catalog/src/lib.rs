//! Catalog domain module.
//!
//! Item definitions (name, description, price) independent of who owns them.
//! Pure domain logic: validation and state transitions, no IO.

pub mod item;

pub use item::{CatalogItem, NewCatalogItem, UpdateCatalogItem, default_items};
