use std::sync::RwLock;

use catalog_core::ProductId;
use catalog_products::{Product, Variant};

use super::r#trait::{CatalogStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    variants: Vec<Variant>,
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Mirrors the relational constraints that matter to
/// the engine (unique primary keys, variant -> product foreign key) and keeps
/// rows in insertion order. Uses the non-atomic default `save_cascade`.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }

    /// Total variant rows (all products).
    pub fn variant_count(&self) -> Result<usize, StoreError> {
        self.tables
            .read()
            .map(|t| t.variants.len())
            .map_err(|_| Self::poisoned())
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.products.clone())
    }

    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .variants
            .iter()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        if tables.products.iter().any(|p| p.id == product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        // Rows never carry children; variants live in their own table.
        tables.products.push(product.clone().with_variants(Vec::new()));
        Ok(())
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        if !tables.products.iter().any(|p| p.id == variant.product_id) {
            return Err(StoreError::Constraint(format!(
                "variant {} references missing product {}",
                variant.id, variant.product_id
            )));
        }
        if tables.variants.iter().any(|v| v.id == variant.id) {
            return Err(StoreError::Conflict(format!(
                "variant {} already exists",
                variant.id
            )));
        }
        tables.variants.push(variant.clone());
        Ok(())
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.products.len() as u64)
    }
}
