use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use catalog_core::ProductId;

use super::ImportError;
use super::feed::{FeedProduct, ProductFeed};
use crate::catalog::CatalogAssembler;
use crate::store::CatalogStore;

/// Products taken from the feed unless configured otherwise.
pub const DEFAULT_SEED_LIMIT: usize = 10;

/// How a seed run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held products; nothing was fetched or written.
    Skipped { existing: u64 },

    /// Every selected product was saved.
    Seeded { saved: usize },

    /// `saved` products went in, then decoding or saving `failed_product`
    /// failed. The rest were not attempted.
    Partial {
        saved: usize,
        failed_product: ProductId,
        error: ImportError,
    },

    /// Count check or feed fetch failed; nothing was saved.
    Failed { error: ImportError },
}

impl SeedOutcome {
    pub fn saved(&self) -> usize {
        match self {
            SeedOutcome::Seeded { saved } | SeedOutcome::Partial { saved, .. } => *saved,
            SeedOutcome::Skipped { .. } | SeedOutcome::Failed { .. } => 0,
        }
    }

    /// Emit one log line describing the outcome.
    pub fn log(&self) {
        match self {
            SeedOutcome::Skipped { existing } => {
                info!(existing, "catalog already populated; seed import skipped");
            }
            SeedOutcome::Seeded { saved } => {
                info!(saved, "seed import completed");
            }
            SeedOutcome::Partial {
                saved,
                failed_product,
                error,
            } => {
                warn!(
                    saved,
                    failed_product = %failed_product,
                    error = %error,
                    "seed import stopped after a failed save"
                );
            }
            SeedOutcome::Failed { error } => {
                error!(error = %error, "seed import failed; catalog left empty");
            }
        }
    }
}

/// Seeds an empty catalog from a [`ProductFeed`].
///
/// The emptiness check and the saves are not synchronized with other
/// writers: two runs (or a run and a manual save) that both observe an empty
/// store can both import.
pub struct SeedImporter<S, F> {
    catalog: Arc<CatalogAssembler<S>>,
    feed: F,
    limit: usize,
}

impl<S, F> SeedImporter<S, F>
where
    S: CatalogStore,
    F: ProductFeed,
{
    pub fn new(catalog: Arc<CatalogAssembler<S>>, feed: F) -> Self {
        Self {
            catalog,
            feed,
            limit: DEFAULT_SEED_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Run the import once. Never fails; see [`SeedOutcome`].
    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn run(&self) -> SeedOutcome {
        let existing = match self.catalog.count_products().await {
            Ok(n) => n,
            Err(e) => return SeedOutcome::Failed { error: e.into() },
        };
        if existing > 0 {
            return SeedOutcome::Skipped { existing };
        }

        info!("catalog is empty; fetching seed products");
        let document = match self.feed.fetch().await {
            Ok(doc) => doc,
            Err(error) => return SeedOutcome::Failed { error },
        };

        info!(entries = document.len(), "seed feed fetched");

        // Only the entries within the limit are decoded.
        let mut saved = 0;
        for entry in document.products.into_iter().take(self.limit) {
            let requested = FeedProduct::raw_id(&entry);
            let payload = match FeedProduct::from_value(entry) {
                Ok(product) => product.into_new_product(),
                Err(error) => {
                    return SeedOutcome::Partial {
                        saved,
                        failed_product: requested,
                        error,
                    };
                }
            };

            match self.catalog.save_product(payload).await {
                Ok(product_id) => {
                    saved += 1;
                    debug!(product_id = %product_id, "seed product saved");
                }
                Err(e) => {
                    return SeedOutcome::Partial {
                        saved,
                        failed_product: requested,
                        error: e.into(),
                    };
                }
            }
        }

        SeedOutcome::Seeded { saved }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use catalog_core::{FixedClock, SequenceIdGenerator};

    use super::*;
    use crate::catalog::CatalogError;
    use crate::catalog::test_support::RecordingStore;
    use crate::seed::{FeedDocument, FeedProduct, FeedVariant, StaticProductFeed};
    use crate::store::StoreError;

    fn catalog(store: Arc<RecordingStore>) -> Arc<CatalogAssembler<Arc<RecordingStore>>> {
        Arc::new(CatalogAssembler::with_parts(
            store,
            SequenceIdGenerator::starting_at(9_000),
            FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ))
    }

    fn feed_product(id: i64, variants: usize) -> FeedProduct {
        FeedProduct {
            id,
            title: Some(format!("Feed product {id}")),
            vendor: Some("Famme".to_string()),
            product_type: Some("Apparel".to_string()),
            variants: (0..variants as i64)
                .map(|n| FeedVariant {
                    id: id * 100 + n,
                    title: Some(format!("Size {n}")),
                    sku: None,
                    price: Decimal::new(29900, 2),
                    available: true,
                    option1: Some("S".to_string()),
                    option2: None,
                })
                .collect(),
        }
    }

    fn feed_of(count: i64) -> StaticProductFeed {
        StaticProductFeed::new(FeedDocument {
            products: (1..=count)
                .map(|id| serde_json::to_value(feed_product(id, 2)).unwrap())
                .collect(),
        })
    }

    #[tokio::test]
    async fn non_empty_store_skips_without_fetching_or_writing() {
        let store = Arc::new(RecordingStore::new());
        let catalog = catalog(store.clone());
        catalog
            .save_product(feed_product(77, 1).into_new_product())
            .await
            .unwrap();
        let writes_before = store.writes();

        let importer = SeedImporter::new(catalog, feed_of(3));
        let outcome = importer.run().await;

        assert_eq!(outcome, SeedOutcome::Skipped { existing: 1 });
        assert_eq!(importer.feed().calls(), 0);
        assert_eq!(store.writes(), writes_before);
    }

    #[tokio::test]
    async fn imports_at_most_limit_products() {
        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(15));

        let outcome = importer.run().await;

        assert_eq!(outcome, SeedOutcome::Seeded { saved: 10 });
        assert_eq!(store.product_inserts.lock().unwrap().len(), 10);
        assert_eq!(store.variant_inserts.lock().unwrap().len(), 20);
        assert_eq!(importer.feed().calls(), 1);
    }

    #[tokio::test]
    async fn limit_is_configurable() {
        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(15)).with_limit(3);

        assert_eq!(importer.run().await.saved(), 3);
    }

    #[tokio::test]
    async fn feed_ids_and_fields_are_preserved() {
        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(2));

        importer.run().await;

        let products = store.product_inserts.lock().unwrap();
        assert_eq!(products[0].id, ProductId::new(1));
        assert_eq!(products[1].id, ProductId::new(2));
        assert_eq!(products[0].product_type, "Apparel");

        let variants = store.variant_inserts.lock().unwrap();
        assert_eq!(variants[0].id.get(), 100);
        assert_eq!(variants[0].sku, "");
        assert_eq!(variants[0].price, Decimal::new(29900, 2));
    }

    #[tokio::test]
    async fn feed_failure_is_swallowed_without_inserts() {
        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(
            catalog(store.clone()),
            StaticProductFeed::failing(ImportError::Network("connection refused".to_string())),
        );

        let outcome = importer.run().await;

        assert!(matches!(
            outcome,
            SeedOutcome::Failed {
                error: ImportError::Network(_)
            }
        ));
        assert_eq!(store.writes(), 0);
        assert_eq!(outcome.saved(), 0);
    }

    #[tokio::test]
    async fn count_failure_is_reported_without_fetching() {
        let store = Arc::new(RecordingStore {
            fail_count: true,
            ..RecordingStore::default()
        });
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(3));

        let outcome = importer.run().await;

        assert!(matches!(
            outcome,
            SeedOutcome::Failed {
                error: ImportError::Storage(CatalogError::Storage(StoreError::Backend(_)))
            }
        ));
        assert_eq!(importer.feed().calls(), 0);
        assert_eq!(store.count_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_save_stops_the_run_and_keeps_earlier_products() {
        // Variants 0..=3 belong to products 1 and 2; the fifth insert is product 3's first.
        let store = Arc::new(RecordingStore {
            fail_variant_insert_at: Some(4),
            ..RecordingStore::default()
        });
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(5));

        let outcome = importer.run().await;

        match outcome {
            SeedOutcome::Partial {
                saved,
                failed_product,
                ..
            } => {
                assert_eq!(saved, 2);
                assert_eq!(failed_product, ProductId::new(3));
            }
            other => panic!("expected partial outcome, got {other:?}"),
        }
        // Products 4 and 5 are never attempted.
        assert_eq!(store.product_inserts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_feed_seeds_nothing() {
        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(catalog(store.clone()), feed_of(0));

        assert_eq!(importer.run().await, SeedOutcome::Seeded { saved: 0 });
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn malformed_entry_past_the_limit_is_never_decoded() {
        let mut products: Vec<serde_json::Value> = (1..=15)
            .map(|id| serde_json::to_value(feed_product(id, 1)).unwrap())
            .collect();
        products[13]["variants"][0]["price"] = serde_json::Value::Null;
        products[14] = serde_json::json!({ "id": 15, "variants": [{ "price": ["bad"] }] });

        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(
            catalog(store.clone()),
            StaticProductFeed::new(FeedDocument { products }),
        );

        assert_eq!(importer.run().await, SeedOutcome::Seeded { saved: 10 });
        assert_eq!(store.product_inserts.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn null_price_within_the_limit_seeds_as_zero() {
        let mut entry = serde_json::to_value(feed_product(1, 1)).unwrap();
        entry["variants"][0]["price"] = serde_json::Value::Null;
        entry["variants"][0]["available"] = serde_json::Value::Null;

        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(
            catalog(store.clone()),
            StaticProductFeed::new(FeedDocument { products: vec![entry] }),
        );

        assert_eq!(importer.run().await, SeedOutcome::Seeded { saved: 1 });
        let variants = store.variant_inserts.lock().unwrap();
        assert_eq!(variants[0].price, Decimal::ZERO);
        assert!(!variants[0].available);
    }

    #[tokio::test]
    async fn undecodable_entry_within_the_limit_stops_the_run() {
        let mut products: Vec<serde_json::Value> = (1..=3)
            .map(|id| serde_json::to_value(feed_product(id, 1)).unwrap())
            .collect();
        products[1] = serde_json::json!({ "id": 2, "variants": "none" });

        let store = Arc::new(RecordingStore::new());
        let importer = SeedImporter::new(
            catalog(store.clone()),
            StaticProductFeed::new(FeedDocument { products }),
        );

        match importer.run().await {
            SeedOutcome::Partial {
                saved,
                failed_product,
                error,
            } => {
                assert_eq!(saved, 1);
                assert_eq!(failed_product, ProductId::new(2));
                assert!(matches!(error, ImportError::Parse(_)));
            }
            other => panic!("expected partial outcome, got {other:?}"),
        }
        assert_eq!(store.product_inserts.lock().unwrap().len(), 1);
    }
}
