use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::instrument;

use catalog_core::{ProductId, VariantId};
use catalog_products::{NewProduct, NewVariant};

use super::ImportError;

/// Top-level feed document: `{ "products": [...] }`.
///
/// Entries stay raw JSON until the importer picks them, so a malformed
/// entry only fails when it is actually imported.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Value>,
}

/// One product entry as published by the feed.
///
/// Unknown fields (images, tags, handles, ...) are ignored. Fields the feed
/// sends as `null` take their default (`0`, empty, `false`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedProduct {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub variants: Vec<FeedVariant>,
}

/// One variant entry as published by the feed.
///
/// `price` is accepted as either a JSON string (`"299.00"`) or a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedVariant {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    pub title: Option<String>,
    pub sku: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub price: Decimal,
    #[serde(deserialize_with = "null_as_default")]
    pub available: bool,
    pub option1: Option<String>,
    pub option2: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeedDocument {
    /// Raw entry count, including entries that may not decode.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FeedProduct {
    /// Decode one raw feed entry.
    pub fn from_value(entry: Value) -> Result<Self, ImportError> {
        serde_json::from_value(entry).map_err(|e| ImportError::Parse(e.to_string()))
    }

    /// Best-effort id of a raw entry, for reporting entries that fail to decode.
    pub fn raw_id(entry: &Value) -> ProductId {
        entry
            .get("id")
            .and_then(Value::as_i64)
            .map_or(ProductId::UNASSIGNED, ProductId::new)
    }

    /// Map the feed entry onto a save payload, keeping the feed's ids.
    pub fn into_new_product(self) -> NewProduct {
        let product_id = ProductId::new(self.id);
        NewProduct {
            id: product_id,
            title: self.title.unwrap_or_default(),
            vendor: self.vendor.unwrap_or_default(),
            product_type: self.product_type.unwrap_or_default(),
            variants: self
                .variants
                .into_iter()
                .map(|v| NewVariant {
                    id: VariantId::new(v.id),
                    product_id,
                    title: v.title.unwrap_or_default(),
                    sku: v.sku.unwrap_or_default(),
                    price: v.price,
                    available: v.available,
                    option1: v.option1,
                    option2: v.option2,
                })
                .collect(),
        }
    }
}

/// Source of seed products.
#[async_trait::async_trait]
pub trait ProductFeed: Send + Sync {
    async fn fetch(&self) -> Result<FeedDocument, ImportError>;
}

/// Feed fetched over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpProductFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpProductFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl ProductFeed for HttpProductFeed {
    #[instrument(skip(self), fields(url = %self.url), err)]
    async fn fetch(&self) -> Result<FeedDocument, ImportError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ImportError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ImportError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ImportError::Network(e.to_string()))?;
        parse_document(&body)
    }
}

/// Decode a raw feed body.
pub fn parse_document(body: &[u8]) -> Result<FeedDocument, ImportError> {
    serde_json::from_slice(body).map_err(|e| ImportError::Parse(e.to_string()))
}

/// Canned feed for tests and offline runs. Counts how often it was fetched.
#[derive(Debug)]
pub struct StaticProductFeed {
    response: Result<FeedDocument, ImportError>,
    calls: AtomicUsize,
}

impl StaticProductFeed {
    pub fn new(document: FeedDocument) -> Self {
        Self {
            response: Ok(document),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ImportError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProductFeed for StaticProductFeed {
    async fn fetch(&self) -> Result<FeedDocument, ImportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}
