//! Infrastructure layer: catalog persistence, assembly, seed import, config.

pub mod catalog;
pub mod config;
pub mod seed;
pub mod store;


pub use catalog::{CatalogAssembler, CatalogError};
pub use config::{CatalogConfig, ConfigError};
pub use seed::{HttpProductFeed, ImportError, ProductFeed, SeedImporter, SeedOutcome};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError};
