use std::sync::Arc;

use thiserror::Error;

use catalog_core::ProductId;
use catalog_products::{Product, Variant};

/// Persistence gateway error.
///
/// These are **infrastructure errors** (connectivity, constraints) as opposed
/// to domain errors (validation). Callers treat all of them as "storage
/// failed"; the variants only refine how the failure is reported.
///
/// ## Error Categories
///
/// - **Conflict**: a row with the same primary key already exists
/// - **Constraint**: a foreign key or check constraint rejected the row
/// - **Backend**: connectivity, pool, decoding or any other store failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Relational store for the catalog (`products` + `variants`).
///
/// ## Read Semantics
///
/// - `list_products()` returns product rows with `variants` left empty, in
///   whatever order the backend produces
/// - `list_variants()` is scoped by foreign key and returns an empty vector
///   (not an error) when a product has no variants
///
/// ## Write Semantics
///
/// Writes are append-only inserts. Re-inserting an existing id is a
/// `StoreError::Conflict`; a variant whose `product_id` does not reference an
/// existing product is a `StoreError::Constraint`.
///
/// `save_cascade()` writes a product row followed by each of its variants, in
/// order. The default implementation is **not atomic**: it stops at the first
/// failing statement and leaves earlier rows in place. Backends with
/// transactions override it to make the cascade all-or-nothing.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// All product rows (variants not populated).
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Variants of one product, in backend order.
    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError>;

    /// A single product row (variants not populated).
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Insert one product row. The id must already be assigned.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Insert one variant row. Its product must already exist.
    async fn insert_variant(&self, variant: &Variant) -> Result<(), StoreError>;

    /// Number of product rows.
    async fn count_products(&self) -> Result<u64, StoreError>;

    /// Insert a product and then its variants.
    async fn save_cascade(&self, product: &Product) -> Result<(), StoreError> {
        self.insert_product(product).await?;
        for variant in &product.variants {
            self.insert_variant(variant).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        (**self).list_variants(product_id).await
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_product(product_id).await
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        (**self).insert_product(product).await
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        (**self).insert_variant(variant).await
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        (**self).count_products().await
    }

    async fn save_cascade(&self, product: &Product) -> Result<(), StoreError> {
        (**self).save_cascade(product).await
    }
}
