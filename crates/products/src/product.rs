use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, IdGenerator, ProductId, VariantId};

/// A persisted product and its ordered variants.
///
/// `variants` is only populated on reads that assemble the full catalog; a
/// bare products row comes back with an empty sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// A persisted variant, owned by exactly one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub sku: String,
    pub price: Decimal,
    pub available: bool,
    pub option1: Option<String>,
    pub option2: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Same product with `variants` replaced (read-side assembly).
    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }
}

/// Caller payload for creating a product.
///
/// `id == 0` means "assign one for me"; any other value is kept as-is.
/// Timestamps are deliberately absent: the engine stamps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProduct {
    pub id: ProductId,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    pub variants: Vec<NewVariant>,
}

/// Caller payload for one variant of a [`NewProduct`].
///
/// `product_id` is accepted for compatibility with existing clients but is
/// always overwritten with the owning product's resolved id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub sku: String,
    pub price: Decimal,
    pub available: bool,
    pub option1: Option<String>,
    pub option2: Option<String>,
}

impl NewProduct {
    /// Check the payload before anything touches storage.
    pub fn validate(&self) -> DomainResult<()> {
        self.id.validate()?;

        if self.title.trim().is_empty() {
            return Err(DomainError::validation("product title cannot be blank"));
        }

        for (idx, variant) in self.variants.iter().enumerate() {
            variant.id.validate()?;
            if variant.price < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "variant {idx} has a negative price ({})",
                    variant.price
                )));
            }
        }

        Ok(())
    }

    /// Turn the payload into a persistable product.
    ///
    /// - unassigned ids (product and variants) are drawn from `ids`
    /// - every variant's `product_id` is forced to the resolved product id
    /// - one timestamp `at` is used for every `created_at`/`updated_at`
    /// - variant order is preserved
    pub fn assign<G>(self, ids: &G, at: DateTime<Utc>) -> Product
    where
        G: IdGenerator + ?Sized,
    {
        let product_id = self.id.resolve(ids);

        let variants = self
            .variants
            .into_iter()
            .map(|v| Variant {
                id: v.id.resolve(ids),
                product_id,
                title: v.title,
                sku: v.sku,
                price: v.price,
                available: v.available,
                option1: v.option1,
                option2: v.option2,
                created_at: at,
                updated_at: at,
            })
            .collect();

        Product {
            id: product_id,
            title: self.title,
            vendor: self.vendor,
            product_type: self.product_type,
            created_at: at,
            updated_at: at,
            variants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::SequenceIdGenerator;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap()
    }

    fn variant(id: i64, product_id: i64, price: &str) -> NewVariant {
        NewVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(product_id),
            title: format!("Variant {id}"),
            sku: format!("SKU-{id}"),
            price: price.parse().unwrap(),
            available: true,
            option1: Some("M".to_string()),
            option2: None,
        }
    }

    fn payload(id: i64, variants: Vec<NewVariant>) -> NewProduct {
        NewProduct {
            id: ProductId::new(id),
            title: "Linen Shirt".to_string(),
            vendor: "Famme".to_string(),
            product_type: "Apparel".to_string(),
            variants,
        }
    }

    #[test]
    fn assign_generates_ids_for_sentinels() {
        let ids = SequenceIdGenerator::starting_at(1000);
        let product = payload(0, vec![variant(0, 0, "10.00"), variant(0, 0, "12.50")])
            .assign(&ids, test_time());

        assert_eq!(product.id, ProductId::new(1000));
        assert_eq!(product.variants[0].id, VariantId::new(1001));
        assert_eq!(product.variants[1].id, VariantId::new(1002));
    }

    #[test]
    fn assign_keeps_caller_ids() {
        let ids = SequenceIdGenerator::starting_at(1000);
        let product = payload(5, vec![variant(77, 0, "1")]).assign(&ids, test_time());

        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.variants[0].id, VariantId::new(77));
    }

    #[test]
    fn assign_overrides_caller_product_id_on_variants() {
        let ids = SequenceIdGenerator::starting_at(1);
        let product = payload(9, vec![variant(1, 12345, "3"), variant(2, -1, "4")])
            .assign(&ids, test_time());

        assert!(product.variants.iter().all(|v| v.product_id == ProductId::new(9)));
    }

    #[test]
    fn assign_stamps_one_timestamp_everywhere() {
        let ids = SequenceIdGenerator::default();
        let at = test_time();
        let product = payload(0, vec![variant(0, 0, "1"), variant(0, 0, "2")]).assign(&ids, at);

        assert_eq!(product.created_at, at);
        assert_eq!(product.updated_at, at);
        for v in &product.variants {
            assert_eq!(v.created_at, at);
            assert_eq!(v.updated_at, at);
        }
    }

    #[test]
    fn assign_preserves_variant_order() {
        let ids = SequenceIdGenerator::default();
        let product = payload(3, vec![variant(30, 0, "1"), variant(10, 0, "2"), variant(20, 0, "3")])
            .assign(&ids, test_time());

        let order: Vec<i64> = product.variants.iter().map(|v| v.id.get()).collect();
        assert_eq!(order, vec![30, 10, 20]);
    }

    #[test]
    fn validate_rejects_blank_title() {
        let mut p = payload(0, vec![]);
        p.title = "   ".to_string();
        assert!(matches!(p.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn validate_rejects_negative_price() {
        let p = payload(0, vec![variant(0, 0, "4.00"), variant(0, 0, "-0.01")]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("variant 1"));
    }

    #[test]
    fn validate_rejects_negative_ids() {
        assert!(matches!(payload(-2, vec![]).validate(), Err(DomainError::InvalidId(_))));
        assert!(matches!(
            payload(1, vec![variant(-8, 0, "1")]).validate(),
            Err(DomainError::InvalidId(_))
        ));
    }

    #[test]
    fn validate_allows_empty_variant_list() {
        assert!(payload(0, vec![]).validate().is_ok());
    }

    #[test]
    fn payload_fields_default_when_missing() {
        let p: NewProduct = serde_json::from_str(r#"{"title":"Cap"}"#).unwrap();
        assert!(p.id.is_unassigned());
        assert!(p.variants.is_empty());

        let v: NewVariant = serde_json::from_str(r#"{"price":"19.90"}"#).unwrap();
        assert_eq!(v.price, Decimal::new(1990, 2));
        assert_eq!(v.option1, None);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: any non-negative price passes validation.
            #[test]
            fn non_negative_prices_validate(cents in 0i64..10_000_000) {
                let p = payload(0, vec![NewVariant {
                    price: Decimal::new(cents, 2),
                    ..NewVariant::default()
                }]);
                prop_assert!(p.validate().is_ok());
            }

            /// Property: every assigned variant points at its product.
            #[test]
            fn variants_always_reference_owner(
                product_id in 0i64..1_000_000,
                caller_ids in proptest::collection::vec(-1_000i64..1_000, 0..8)
            ) {
                let ids = SequenceIdGenerator::starting_at(5_000_000);
                let variants = caller_ids
                    .iter()
                    .map(|pid| NewVariant { product_id: ProductId::new(*pid), ..NewVariant::default() })
                    .collect();
                let product = payload(product_id, variants).assign(&ids, test_time());

                prop_assert!(!product.id.is_unassigned());
                for v in &product.variants {
                    prop_assert_eq!(v.product_id, product.id);
                }
            }
        }
    }
}
