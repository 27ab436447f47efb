//! Catalog assembler: the two-level read and the product-then-variants write.
//!
//! ## Read
//!
//! `list_catalog()` fetches every product row, then each product's variants,
//! and attaches them in the order the store returned them. Any store failure
//! aborts the whole call; partial catalogs are never returned.
//!
//! ## Write
//!
//! `save_product()`:
//! 1. validates the payload (no store call on failure)
//! 2. resolves the product id (`0` -> generated, otherwise kept)
//! 3. stamps one `now` on the product and all of its variants
//! 4. resolves each variant id and forces its `product_id` to the product id
//! 5. hands the product to the store's cascade (product row, then variants)
//!
//! Whether step 5 is atomic depends on the store (see `CatalogStore::save_cascade`).
//! When it is not, a failed save may leave a product with fewer variants than
//! requested; callers should re-read (`get_product`) before retrying.

use thiserror::Error;
use tracing::{Span, debug, instrument};

use catalog_core::{Clock, ClockIdGenerator, DomainError, IdGenerator, ProductId, SystemClock};
use catalog_products::{NewProduct, Product};

use crate::store::{CatalogStore, StoreError};

/// Catalog operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The payload was rejected before any write.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Reaching or querying the store failed; not retried.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Orchestrates catalog reads and writes over a [`CatalogStore`].
///
/// Safe to share across tasks; no locking is done here. Row-level atomicity
/// is whatever the store provides.
pub struct CatalogAssembler<S> {
    store: S,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl<S> CatalogAssembler<S>
where
    S: CatalogStore,
{
    /// Assembler with wall-clock ids and timestamps.
    pub fn new(store: S) -> Self {
        Self::with_parts(store, ClockIdGenerator::new(), SystemClock)
    }

    /// Assembler with injected id generation and clock (tests, replays).
    pub fn with_parts(
        store: S,
        ids: impl IdGenerator + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            store,
            ids: Box::new(ids),
            clock: Box::new(clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every product with its variants attached.
    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    pub async fn list_catalog(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self.store.list_products().await?;

        let mut catalog = Vec::with_capacity(products.len());
        for product in products {
            let variants = self.store.list_variants(product.id).await?;
            catalog.push(product.with_variants(variants));
        }

        Span::current().record("product_count", catalog.len());
        Ok(catalog)
    }

    /// One product with its variants, if it exists.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, CatalogError> {
        let Some(product) = self.store.find_product(product_id).await? else {
            return Ok(None);
        };
        let variants = self.store.list_variants(product_id).await?;
        Ok(Some(product.with_variants(variants)))
    }

    /// Persist a product and its variants; returns the resolved product id.
    #[instrument(
        skip(self, input),
        fields(
            requested_id = %input.id,
            variant_count = input.variants.len(),
            product_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn save_product(&self, input: NewProduct) -> Result<ProductId, CatalogError> {
        input.validate()?;

        let now = self.clock.now();
        let product = input.assign(self.ids.as_ref(), now);
        Span::current().record("product_id", product.id.get());

        self.store.save_cascade(&product).await?;

        debug!(
            product_id = %product.id,
            variants = product.variants.len(),
            "product saved"
        );
        Ok(product.id)
    }

    /// Number of persisted products.
    #[instrument(skip(self), err)]
    pub async fn count_products(&self) -> Result<u64, CatalogError> {
        Ok(self.store.count_products().await?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Store doubles that record calls and fail on demand.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use catalog_core::ProductId;
    use catalog_products::{Product, Variant};

    use crate::store::{CatalogStore, InMemoryCatalogStore, StoreError};

    /// In-memory store that counts every gateway call and can be told to
    /// fail specific operations.
    #[derive(Default)]
    pub struct RecordingStore {
        pub inner: InMemoryCatalogStore,
        pub product_inserts: Mutex<Vec<Product>>,
        pub variant_inserts: Mutex<Vec<Variant>>,
        pub count_calls: AtomicUsize,
        pub list_variant_calls: AtomicUsize,
        /// Fail the n-th (0-based) variant insert.
        pub fail_variant_insert_at: Option<usize>,
        pub fail_list_variants: bool,
        pub fail_count: bool,
    }

    impl RecordingStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn writes(&self) -> usize {
            self.product_inserts.lock().unwrap().len() + self.variant_inserts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl CatalogStore for RecordingStore {
        async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
            self.inner.list_products().await
        }

        async fn list_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
            self.list_variant_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list_variants {
                return Err(StoreError::Backend("connection reset".to_string()));
            }
            self.inner.list_variants(product_id).await
        }

        async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
            self.inner.find_product(product_id).await
        }

        async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
            self.product_inserts.lock().unwrap().push(product.clone());
            self.inner.insert_product(product).await
        }

        async fn insert_variant(&self, variant: &Variant) -> Result<(), StoreError> {
            let attempt = {
                let mut calls = self.variant_inserts.lock().unwrap();
                calls.push(variant.clone());
                calls.len() - 1
            };
            if self.fail_variant_insert_at == Some(attempt) {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.insert_variant(variant).await
        }

        async fn count_products(&self) -> Result<u64, StoreError> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_count {
                return Err(StoreError::Backend("database unavailable".to_string()));
            }
            self.inner.count_products().await
        }
    }
}
