use std::sync::Arc;

use tokio::task::JoinHandle;

use catalog_infra::{
    CatalogAssembler, CatalogConfig, CatalogStore, HttpProductFeed, ImportError,
    InMemoryCatalogStore, PostgresCatalogStore, ProductFeed, SeedImporter, SeedOutcome,
    StoreError,
};

/// Store shared by every handler and the seed task.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Catalog assembler over the shared store.
pub type Catalog = CatalogAssembler<SharedStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::InMemory => "in_memory",
            StoreBackend::Postgres => "postgres",
        }
    }
}

/// Application services wired for the HTTP layer.
pub struct AppServices {
    catalog: Arc<Catalog>,
    backend: StoreBackend,
}

impl AppServices {
    pub fn new(store: SharedStore, backend: StoreBackend) -> Self {
        Self {
            catalog: Arc::new(CatalogAssembler::new(store)),
            backend,
        }
    }

    /// Fresh, empty in-memory catalog (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()), StoreBackend::InMemory)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    /// Seed importer bound to this catalog.
    pub fn seed_importer<F: ProductFeed>(&self, feed: F) -> SeedImporter<SharedStore, F> {
        SeedImporter::new(self.catalog.clone(), feed)
    }
}

/// Select the store from configuration: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn build_services(config: &CatalogConfig) -> Result<AppServices, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url, config.database_max_connections).await?;
            tracing::info!(
                max_connections = config.database_max_connections,
                "using postgres catalog store"
            );
            Ok(AppServices::new(Arc::new(store), StoreBackend::Postgres))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory catalog store (data is not persisted)");
            Ok(AppServices::in_memory())
        }
    }
}

/// Run the seed import once in the background and log its outcome.
pub fn spawn_seed_import(
    services: &AppServices,
    config: &CatalogConfig,
) -> Result<JoinHandle<SeedOutcome>, ImportError> {
    let feed = HttpProductFeed::new(config.feed_url.clone(), config.feed_timeout)?;
    let importer = services.seed_importer(feed).with_limit(config.seed_limit);

    Ok(tokio::spawn(async move {
        let outcome = importer.run().await;
        outcome.log();
        outcome
    }))
}
