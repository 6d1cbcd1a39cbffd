//! Database operations for `scraped_products`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pricewatch_core::{ScrapedProduct, SourceSite, StockStatus};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scraped_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapedProductRow {
    pub id: i64,
    pub natural_key: String,
    pub title: String,
    /// `NUMERIC(12, 2)`; never negative.
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub source_url: String,
    pub source_site: String,
    pub affiliate_url: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub specifications: Json<BTreeMap<String, String>>,
    pub availability: bool,
    pub stock_status: String,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapedProductRow {
    /// Convert back into the shared record type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if `source_site` holds a value the
    /// CHECK constraint should have rejected.
    pub fn into_product(self) -> Result<ScrapedProduct, DbError> {
        let source_site =
            self.source_site
                .parse::<SourceSite>()
                .map_err(|_| DbError::InvalidColumn {
                    column: "source_site",
                    value: self.source_site.clone(),
                })?;

        Ok(ScrapedProduct {
            id: Some(self.id),
            title: self.title,
            price: self.price.to_f64().unwrap_or_default(),
            description: self.description,
            image_url: self.image_url,
            source_url: self.source_url,
            source_site,
            affiliate_url: self.affiliate_url,
            timestamp: self.captured_at,
            specifications: self.specifications.0,
            availability: self.availability,
            stock_status: StockStatus::parse_lossy(&self.stock_status),
            rating: self.rating,
            review_count: self.review_count.and_then(|c| u32::try_from(c).ok()),
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, natural_key, title, price, description, image_url, \
     source_url, source_site, affiliate_url, captured_at, specifications, availability, \
     stock_status, rating, review_count, created_at, updated_at";

// ---------------------------------------------------------------------------
// scraped_products operations
// ---------------------------------------------------------------------------

/// Inserts a scraped product or fully replaces the row with the same
/// natural key. The original `id` and `created_at` survive the replace.
///
/// Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_scraped_product(
    pool: &PgPool,
    product: &ScrapedProduct,
    updated_at: DateTime<Utc>,
) -> Result<i64, DbError> {
    let price = Decimal::from_f64(product.price)
        .unwrap_or_default()
        .round_dp(2);
    let review_count = product.review_count.and_then(|c| i32::try_from(c).ok());

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO scraped_products \
             (natural_key, title, price, description, image_url, source_url, source_site, \
              affiliate_url, captured_at, specifications, availability, stock_status, \
              rating, review_count, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (natural_key) DO UPDATE SET \
             title = EXCLUDED.title, \
             price = EXCLUDED.price, \
             description = EXCLUDED.description, \
             image_url = EXCLUDED.image_url, \
             source_url = EXCLUDED.source_url, \
             source_site = EXCLUDED.source_site, \
             affiliate_url = EXCLUDED.affiliate_url, \
             captured_at = EXCLUDED.captured_at, \
             specifications = EXCLUDED.specifications, \
             availability = EXCLUDED.availability, \
             stock_status = EXCLUDED.stock_status, \
             rating = EXCLUDED.rating, \
             review_count = EXCLUDED.review_count, \
             updated_at = EXCLUDED.updated_at \
         RETURNING id",
    )
    .bind(product.natural_key())
    .bind(&product.title)
    .bind(price)
    .bind(&product.description)
    .bind(&product.image_url)
    .bind(&product.source_url)
    .bind(product.source_site.as_str())
    .bind(product.affiliate_url.as_deref())
    .bind(product.timestamp)
    .bind(Json(&product.specifications))
    .bind(product.availability)
    .bind(product.stock_status.as_str())
    .bind(product.rating)
    .bind(review_count)
    .bind(updated_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns every product whose title contains `query`, ignoring case.
///
/// `%`, `_` and `\` in the query match literally. Rows come back ordered by
/// price then id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_products_by_title(
    pool: &PgPool,
    query: &str,
) -> Result<Vec<ScrapedProductRow>, DbError> {
    let pattern = format!("%{}%", escape_like(query));
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM scraped_products \
         WHERE title ILIKE $1 \
         ORDER BY price ASC, id ASC"
    );

    let rows = sqlx::query_as::<_, ScrapedProductRow>(&sql)
        .bind(pattern)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Fetches a single product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_scraped_product(pool: &PgPool, id: i64) -> Result<ScrapedProductRow, DbError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM scraped_products WHERE id = $1");

    sqlx::query_as::<_, ScrapedProductRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Escape `LIKE` metacharacters so `query` matches as a literal substring.
#[must_use]
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
