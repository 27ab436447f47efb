//! Persistence gateway for products and variants.
//!
//! Translates entity reads/writes into parameterized statements. No business
//! rules live here: ids and timestamps arrive already resolved.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use r#trait::{CatalogStore, StoreError};
