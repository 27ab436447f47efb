//! Postgres-backed catalog store.
//!
//! Every statement uses positional bind parameters (`$1..$n`); no value is
//! ever interpolated into SQL text.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Re-inserting an existing product/variant id |
//! | Database (foreign key violation) | `23503` | `Constraint` | Variant referencing a missing product |
//! | Database (check constraint violation) | `23514` | `Constraint` | e.g. negative price |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Io / Tls / other | N/A | `Backend` | Connectivity failures |
//!
//! ## Cascade
//!
//! `save_cascade()` runs the product insert and all variant inserts inside a
//! single transaction, so a failed cascade leaves no partial rows behind.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgExecutor, PgPool, Row};
use tracing::{Span, instrument};

use catalog_core::{ProductId, VariantId};
use catalog_products::{Product, Variant};

use super::r#trait::{CatalogStore, StoreError};

const SELECT_PRODUCTS: &str = r#"
    SELECT id, title, vendor, type, created_at, updated_at
    FROM products
"#;

const SELECT_PRODUCT_BY_ID: &str = r#"
    SELECT id, title, vendor, type, created_at, updated_at
    FROM products
    WHERE id = $1
"#;

const SELECT_VARIANTS_OF_PRODUCT: &str = r#"
    SELECT id, product_id, title, sku, price, available,
           option1, option2, created_at, updated_at
    FROM variants
    WHERE product_id = $1
"#;

const INSERT_PRODUCT: &str = r#"
    INSERT INTO products (id, title, vendor, type, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const INSERT_VARIANT: &str = r#"
    INSERT INTO variants (
        id, product_id, title, sku, price, available,
        option1, option2, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

const COUNT_PRODUCTS: &str = "SELECT COUNT(*) AS total FROM products";

/// Postgres-backed catalog store.
///
/// Cheap to clone; the SQLx pool is shared and thread-safe.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    pub async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(SELECT_PRODUCTS)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = decode_rows::<ProductRow, Product>(&rows, "product")?;
        Span::current().record("product_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn fetch_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query(SELECT_VARIANTS_OF_PRODUCT)
            .bind(product_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_variants", e))?;

        decode_rows::<VariantRow, Variant>(&rows, "variant")
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(SELECT_PRODUCT_BY_ID)
            .bind(product_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;

        match row {
            Some(row) => {
                let product = ProductRow::from_row(&row)
                    .map_err(|e| StoreError::Backend(format!("failed to decode product row: {e}")))?;
                Ok(Some(product.into()))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn fetch_count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query(COUNT_PRODUCTS)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Backend(format!("failed to read count: {e}")))?;
        Ok(total.max(0) as u64)
    }

    /// Product row plus variants in one transaction.
    #[instrument(
        skip(self, product),
        fields(product_id = %product.id, variant_count = product.variants.len()),
        err
    )]
    pub async fn insert_cascade(&self, product: &Product) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        insert_product_row(&mut *tx, product).await?;
        for variant in &product.variants {
            insert_variant_row(&mut *tx, variant).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.fetch_products().await
    }

    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<Variant>, StoreError> {
        self.fetch_variants(product_id).await
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_product(product_id).await
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        insert_product_row(&self.pool, product).await
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<(), StoreError> {
        insert_variant_row(&self.pool, variant).await
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        self.fetch_count().await
    }

    async fn save_cascade(&self, product: &Product) -> Result<(), StoreError> {
        self.insert_cascade(product).await
    }
}

async fn insert_product_row<'e, E>(executor: E, product: &Product) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(INSERT_PRODUCT)
        .bind(product.id.get())
        .bind(&product.title)
        .bind(&product.vendor)
        .bind(&product.product_type)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
    Ok(())
}

async fn insert_variant_row<'e, E>(executor: E, variant: &Variant) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(INSERT_VARIANT)
        .bind(variant.id.get())
        .bind(variant.product_id.get())
        .bind(&variant.title)
        .bind(&variant.sku)
        .bind(variant.price)
        .bind(variant.available)
        .bind(variant.option1.as_deref())
        .bind(variant.option2.as_deref())
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error("insert_variant", e))?;
    Ok(())
}

fn decode_rows<R, T>(rows: &[PgRow], what: &str) -> Result<Vec<T>, StoreError>
where
    R: for<'r> FromRow<'r, PgRow> + Into<T>,
{
    rows.iter()
        .map(|row| {
            R::from_row(row)
                .map(Into::into)
                .map_err(|e| StoreError::Backend(format!("failed to decode {what} row: {e}")))
        })
        .collect()
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    title: String,
    vendor: String,
    product_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            vendor: row.try_get("vendor")?,
            product_type: row.try_get("type")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            title: row.title,
            vendor: row.vendor,
            product_type: row.product_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
            variants: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct VariantRow {
    id: i64,
    product_id: i64,
    title: String,
    sku: String,
    price: Decimal,
    available: bool,
    option1: Option<String>,
    option2: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for VariantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VariantRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            title: row.try_get("title")?,
            sku: row.try_get("sku")?,
            price: row.try_get("price")?,
            available: row.try_get("available")?,
            option1: row.try_get("option1")?,
            option2: row.try_get("option2")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            title: row.title,
            sku: row.sku,
            price: row.price,
            available: row.available,
            option1: row.option1,
            option2: row.option2,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
