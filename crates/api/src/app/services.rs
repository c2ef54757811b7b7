//! Service construction: pick a storage backend and wire the reconciler and
//! catalog administration on top of it.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use trove_catalog::CatalogItem;
use trove_infra::store::{InMemoryRecordStore, SharedStore, StoreError};
use trove_infra::{AppConfig, CatalogAdmin, CatalogError, InventoryReconciler};
use trove_inventory::InventoryRecord;

#[cfg(feature = "postgres")]
use sqlx::PgPool;
#[cfg(feature = "postgres")]
use trove_infra::store::PostgresRecordStore;

pub type InventoryStore = SharedStore<InventoryRecord>;
pub type CatalogStore = SharedStore<CatalogItem>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[cfg(feature = "postgres")]
    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("catalog seeding failed: {0}")]
    Seed(#[from] CatalogError),
}

/// Everything the HTTP handlers need, shared behind one `Arc`.
pub struct AppServices {
    reconciler: InventoryReconciler<InventoryStore, CatalogStore>,
    catalog: CatalogAdmin<CatalogStore>,
}

impl AppServices {
    pub fn new(inventory: InventoryStore, catalog: CatalogStore, grant_max_attempts: u32) -> Self {
        Self {
            reconciler: InventoryReconciler::new(inventory, catalog.clone())
                .with_max_attempts(grant_max_attempts),
            catalog: CatalogAdmin::new(catalog),
        }
    }

    pub fn reconciler(&self) -> &InventoryReconciler<InventoryStore, CatalogStore> {
        &self.reconciler
    }

    pub fn catalog(&self) -> &CatalogAdmin<CatalogStore> {
        &self.catalog
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let services = if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            build_persistent_services(config).await?
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!("USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory");
            build_in_memory_services(config)
        }
    } else {
        build_in_memory_services(config)
    };

    if config.seed_catalog {
        services.catalog().seed_defaults().await?;
    }

    Ok(services)
}

fn build_in_memory_services(config: &AppConfig) -> AppServices {
    info!("using in-memory stores");
    let inventory: InventoryStore = Arc::new(InMemoryRecordStore::<InventoryRecord>::new());
    let catalog: CatalogStore = Arc::new(InMemoryRecordStore::<CatalogItem>::new());
    AppServices::new(inventory, catalog, config.grant_max_attempts)
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(ServicesError::MissingDatabaseUrl)?;

    info!("using postgres stores");
    let pool = Arc::new(PgPool::connect(database_url).await?);

    let inventory = PostgresRecordStore::<InventoryRecord>::from_shared(pool.clone());
    let catalog = PostgresRecordStore::<CatalogItem>::from_shared(pool);
    inventory.ensure_schema().await?;
    catalog.ensure_schema().await?;

    Ok(AppServices::new(
        Arc::new(inventory),
        Arc::new(catalog),
        config.grant_max_attempts,
    ))
}
