//! Postgres-backed implementations of the core storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pricewatch_core::{JobStore, ProductStore, ScrapedProduct, ScrapingJob, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{jobs, products};

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn upsert_product(
        &self,
        product: &ScrapedProduct,
        updated_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        Ok(products::upsert_scraped_product(&self.pool, product, updated_at).await?)
    }

    async fn find_by_title(&self, query: &str) -> Result<Vec<ScrapedProduct>, StoreError> {
        let rows = products::search_products_by_title(&self.pool, query).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_product() {
                Ok(product) => out.push(product),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable product row"),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, product_url: &str) -> Result<ScrapingJob, StoreError> {
        let row = jobs::create_tracking_job(&self.pool, product_url).await?;
        Ok(ScrapingJob::try_from(row)?)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        Ok(jobs::start_tracking_job(&self.pool, id).await?)
    }

    async fn mark_completed(&self, id: Uuid, scraped_at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(jobs::complete_tracking_job(&self.pool, id, scraped_at).await?)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), StoreError> {
        Ok(jobs::fail_tracking_job(&self.pool, id, error).await?)
    }

    async fn get_job(&self, id: Uuid) -> Result<ScrapingJob, StoreError> {
        let row = jobs::get_tracking_job(&self.pool, id).await?;
        Ok(ScrapingJob::try_from(row)?)
    }
}
