//! Inventory domain module.
//!
//! Ownership records (user, catalog item, quantity), the additive grant rule,
//! and the join that enriches records with catalog metadata. Pure domain logic
//! (no IO, no HTTP, no storage).

pub mod record;
pub mod view;

pub use record::{GrantItem, InventoryRecord};
pub use view::{InventoryItemView, JoinError, join_with_catalog};
