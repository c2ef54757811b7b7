//! Generic keyed record store boundary.
//!
//! One capability trait, [`RecordStore`], parameterized by record type, with an
//! in-memory arena backend (tests/dev) and a Postgres backend (production,
//! behind the `postgres` feature).

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;
pub use r#trait::{RecordStore, SharedStore, StoreError};
