use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{ProductId, VariantId};
use catalog_products::{NewProduct, NewVariant, Product};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /products`.
///
/// Ids default to `0` (generate). `type` is accepted as an alias of
/// `product_type` for clients of the older form API.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProductRequest {
    pub id: i64,
    pub title: String,
    pub vendor: String,
    #[serde(alias = "type")]
    pub product_type: String,
    pub variants: Vec<CreateVariantRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateVariantRequest {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub sku: String,
    pub price: Decimal,
    pub available: bool,
    pub option1: Option<String>,
    pub option2: Option<String>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        NewProduct {
            id: ProductId::new(req.id),
            title: req.title,
            vendor: req.vendor,
            product_type: req.product_type,
            variants: req.variants.into_iter().map(NewVariant::from).collect(),
        }
    }
}

impl From<CreateVariantRequest> for NewVariant {
    fn from(req: CreateVariantRequest) -> Self {
        NewVariant {
            id: VariantId::new(req.id),
            product_id: ProductId::new(req.product_id),
            title: req.title,
            sku: req.sku,
            price: req.price,
            available: req.available,
            // Form posts send empty strings for unset options.
            option1: req.option1.filter(|o| !o.is_empty()),
            option2: req.option2.filter(|o| !o.is_empty()),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductCreated {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductCount {
    pub count: u64,
}
