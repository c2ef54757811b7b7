//! Infrastructure layer: record stores, reconciliation, catalog administration
//! and configuration.

pub mod catalog_admin;
pub mod config;
pub mod reconciler;
pub mod store;


pub use catalog_admin::{CatalogAdmin, CatalogError};
pub use config::{AppConfig, ConfigError};
pub use reconciler::{InventoryReconciler, ReconcileError};
